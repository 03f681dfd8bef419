//! Managed file exchange
//!
//! Upload with versioning, move-to-done and serve lookups for the CSV files
//! shared with the lighting controller. All operations are independent of
//! HTTP; the handler layer maps their results to responses.

mod error;
mod locks;
pub mod naming;
mod store;

pub use error::ExchangeError;
pub use store::{FileStore, ServedFile, UploadOutcome};
