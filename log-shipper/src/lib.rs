//! Log Shipper Library
//!
//! Watches directories for finished log files, uploads them to an ingestion
//! server and keeps a manifest of what the server accepted or rejected.

pub mod backlog;
pub mod config;
pub mod daemon;
pub mod fs;
pub mod manifest;
pub mod upload;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use manifest::Manifest;
pub use upload::{UploadOutcome, Uploader};
pub use utils::errors::ShipperError;
pub type Result<T> = std::result::Result<T, ShipperError>;
