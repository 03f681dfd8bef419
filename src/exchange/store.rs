//! Managed file store
//!
//! Owns the three directories (incoming/base, done, history) and performs the
//! upload, move and serve operations against them.

use chrono::Local;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::ExchangeError;
use super::locks::FileLocks;
use super::naming;
use crate::config::StorageConfig;
use crate::http::mime;
use crate::logger;

/// Result of an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// No previous file existed
    Created,
    /// Previous content differed and was archived under `archive`
    Replaced { archive: String },
    /// Content identical to the current file, nothing written
    Unchanged,
}

/// A file resolved for serving
#[derive(Debug)]
pub struct ServedFile {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

pub struct FileStore {
    base_dir: PathBuf,
    done_dir: PathBuf,
    history_dir: PathBuf,
    allowed_files: HashSet<String>,
    locks: FileLocks,
}

impl FileStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            done_dir: config.done_dir(),
            history_dir: config.history_dir(),
            allowed_files: config.allowed_files.iter().cloned().collect(),
            locks: FileLocks::new(),
        }
    }

    #[cfg(test)]
    fn done_dir(&self) -> &Path {
        &self.done_dir
    }

    #[cfg(test)]
    fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Validate an upload target without touching the filesystem
    pub fn check_upload_name(&self, name: &str) -> Result<(), ExchangeError> {
        if !naming::is_safe_filename(name) {
            return Err(ExchangeError::InvalidInput("bad filename"));
        }
        if !self.allowed_files.contains(name) {
            return Err(ExchangeError::Forbidden);
        }
        Ok(())
    }

    /// Store `body` as the current version of `name`.
    ///
    /// Identical content is a no-op. Different content archives the previous
    /// bytes into the history directory before overwriting. The overwrite is
    /// a plain write: an interrupted write can leave a truncated file.
    pub async fn upload(&self, name: &str, body: &[u8]) -> Result<UploadOutcome, ExchangeError> {
        self.check_upload_name(name)?;

        let _guard = self.locks.lock(name).await;
        let dest = self.base_dir.join(name);

        let archive = match fs::read(&dest).await {
            Ok(existing) if existing == body => {
                logger::log_upload(name, "unchanged, skipped");
                return Ok(UploadOutcome::Unchanged);
            }
            Ok(_) => {
                let archive = self.archive_current(name, &dest).await?;
                logger::log_upload(name, &format!("archived as {archive}"));
                Some(archive)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        fs::write(&dest, body).await?;
        logger::log_upload(name, &format!("saved ({} bytes)", body.len()));

        Ok(archive.map_or(UploadOutcome::Created, |archive| UploadOutcome::Replaced {
            archive,
        }))
    }

    /// Move `name` from the base directory into the done directory
    pub async fn move_to_done(&self, name: &str) -> Result<(), ExchangeError> {
        if !naming::is_safe_filename(name) {
            return Err(ExchangeError::InvalidInput("bad file"));
        }

        let _guard = self.locks.lock(name).await;
        let src = self.base_dir.join(name);
        if !is_regular_file(&src).await {
            return Err(ExchangeError::NotFound);
        }

        fs::create_dir_all(&self.done_dir).await?;
        let dst = self.done_dir.join(name);
        match fs::rename(&src, &dst).await {
            Ok(()) => {}
            Err(e) if is_cross_device(&e) => {
                logger::log_warning(&format!(
                    "rename {} -> {} crosses filesystems, falling back to copy",
                    src.display(),
                    dst.display()
                ));
                move_across_devices(&src, &dst).await?;
            }
            Err(e) => return Err(e.into()),
        }
        logger::log_move(name, &dst);
        Ok(())
    }

    /// Resolve `relative_path` inside the base directory and load it.
    ///
    /// Paths that escape the base directory after canonicalization are
    /// reported as not found.
    pub async fn read_served(&self, relative_path: &str) -> Result<ServedFile, ExchangeError> {
        let base = match fs::canonicalize(&self.base_dir).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Base directory not found or inaccessible '{}': {e}",
                    self.base_dir.display()
                ));
                return Err(ExchangeError::NotFound);
            }
        };

        // Missing files are the common 404 case, no need to log
        let Ok(resolved) = fs::canonicalize(base.join(relative_path)).await else {
            return Err(ExchangeError::NotFound);
        };
        if !resolved.starts_with(&base) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {relative_path} -> {}",
                resolved.display()
            ));
            return Err(ExchangeError::NotFound);
        }
        if !is_regular_file(&resolved).await {
            return Err(ExchangeError::NotFound);
        }

        let data = fs::read(&resolved).await?;
        Ok(ServedFile {
            data,
            content_type: mime::get_content_type(relative_path),
        })
    }

    /// Copy the current file into history, returning the archive name
    async fn archive_current(&self, name: &str, current: &Path) -> Result<String, ExchangeError> {
        fs::create_dir_all(&self.history_dir).await?;

        let now = Local::now().naive_local();
        let mut archive = naming::archive_name(name, now);
        let mut counter = 1;
        while fs::try_exists(self.history_dir.join(&archive)).await? {
            archive = naming::archive_name_with_counter(name, now, counter);
            counter += 1;
        }

        copy_with_metadata(current, &self.history_dir.join(&archive)).await?;
        Ok(archive)
    }
}

/// `true` when `path` exists and is a regular file (symlinks followed)
async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// `rename(2)` fails with `EXDEV` when source and target are on different filesystems
fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Copy `src` to `dst`, then remove `src`.
///
/// On failure the copy is discarded so the file only ever lives at `src`.
async fn move_across_devices(src: &Path, dst: &Path) -> io::Result<()> {
    let result = match fs::copy(src, dst).await {
        Ok(_) => fs::remove_file(src).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(dst).await {
            if cleanup.kind() != io::ErrorKind::NotFound {
                logger::log_error(&format!(
                    "failed to discard incomplete move target {}: {cleanup}",
                    dst.display()
                ));
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Copy bytes and permissions, then carry over the modification time
async fn copy_with_metadata(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).await?;
    let modified = fs::metadata(src).await?.modified()?;
    let file = fs::OpenOptions::new().write(true).open(dst).await?;
    file.into_std().await.set_modified(modified)
}
