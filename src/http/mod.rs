//! HTTP protocol layer module
//!
//! Response builders and content-type detection, decoupled from the file exchange logic.

pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{build_error_response, build_file_response, build_text_response};
