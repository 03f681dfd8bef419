// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub routes: RoutesConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Managed file storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the live CSV files (served and uploaded)
    pub base_dir: PathBuf,
    /// Destination for files moved via the move endpoint (default: `<base_dir>/done`)
    #[serde(default)]
    pub done_dir: Option<PathBuf>,
    /// Destination for archived versions (default: `<base_dir>/history`)
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    /// Filenames the controller may push back
    pub allowed_files: Vec<String>,
    /// Upper bound on the declared upload size
    pub max_upload_bytes: u64,
}

impl StorageConfig {
    pub fn done_dir(&self) -> PathBuf {
        self.done_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("done"))
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("history"))
    }
}

/// Endpoint paths
#[derive(Debug, Deserialize, Clone)]
pub struct RoutesConfig {
    /// Equivalent mount points for the base directory
    pub served_roots: Vec<String>,
    pub upload_path: String,
    pub move_path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    super::DEFAULT_ACCESS_LOG_FORMAT.to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}
