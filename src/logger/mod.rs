//! Logger module
//!
//! Provides logging utilities for the CSV exchange server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Upload/move notices for operators
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("CSV exchange server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!(
        "Base directory: {}",
        config.storage.base_dir.display()
    ));
    write_info(&format!("Done directory: {}", config.storage.done_dir().display()));
    write_info(&format!(
        "History directory: {}",
        config.storage.history_dir().display()
    ));
    write_info(&format!(
        "Upload allow-list: {}",
        config.storage.allowed_files.join(", ")
    ));
    write_info(&format!(
        "Served roots: {}",
        config.routes.served_roots.join(", ")
    ));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_shutdown() {
    write_info("[Shutdown] Listener closed, exiting");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

/// Upload notice, e.g. `[upload] light_colors.csv: saved (120 bytes)`
pub fn log_upload(file_name: &str, message: &str) {
    write_info(&format!("[upload] {file_name}: {message}"));
}

pub fn log_move(file_name: &str, destination: &Path) {
    write_info(&format!(
        "[move] {file_name}: moved to {}",
        destination.display()
    ));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}
