//! Per-filename mutual exclusion
//!
//! Uploads and moves of the same filename run one at a time; operations on
//! different filenames never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock table keyed by filename, entries created on demand
#[derive(Debug, Default)]
pub struct FileLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`. Access ends when the guard drops.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries referenced only by the table are idle
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(name.to_string()).or_default())
        };
        entry.lock_owned().await
    }

    /// Number of filenames currently held or awaited
    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = FileLocks::new();
        let guard = locks.lock("light_patterns.csv").await;

        let second =
            tokio::time::timeout(Duration::from_millis(50), locks.lock("light_patterns.csv")).await;
        assert!(second.is_err(), "second lock must wait while the first is held");

        drop(guard);
        let third =
            tokio::time::timeout(Duration::from_millis(50), locks.lock("light_patterns.csv")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = FileLocks::new();
        let _patterns = locks.lock("light_patterns.csv").await;
        let colors =
            tokio::time::timeout(Duration::from_millis(50), locks.lock("light_colors.csv")).await;
        assert!(colors.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = FileLocks::new();
        drop(locks.lock("a.csv").await);
        drop(locks.lock("b.csv").await);
        assert!(locks.is_empty());

        let _held = locks.lock("c.csv").await;
        assert_eq!(locks.inner.lock().unwrap().len(), 1);
    }
}
