// Application state module
// Shared state handed to every request handler

use std::sync::atomic::AtomicUsize;

use super::types::Config;
use crate::exchange::FileStore;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Managed file operations, guarded by per-filename locks
    pub store: FileStore,
    /// Currently open connections (checked against `performance.max_connections`)
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: FileStore::new(&config.storage),
            active_connections: AtomicUsize::new(0),
        }
    }
}
