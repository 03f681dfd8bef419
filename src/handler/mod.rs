//! Request handler module
//!
//! Responsible for request routing dispatch onto the file exchange operations.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
