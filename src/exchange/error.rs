//! Error taxonomy for managed file operations
//!
//! Every variant maps to a status code and a short plaintext body.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Unsafe filename or out-of-range content length
    #[error("{0}")]
    InvalidInput(&'static str),

    /// Filename not on the upload allow-list
    #[error("file not allowed")]
    Forbidden,

    /// Requested file absent, or route unmatched
    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExchangeError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Io(_) => 500,
        }
    }

    /// Response body sent to the client. I/O details stay in the error log.
    pub const fn body(&self) -> &'static str {
        match self {
            Self::InvalidInput(message) => *message,
            Self::Forbidden => "file not allowed",
            Self::NotFound => "not found",
            Self::Io(_) => "internal error",
        }
    }
}
