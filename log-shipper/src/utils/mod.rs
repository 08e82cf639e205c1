//! Utility modules for the log shipper.

pub mod errors;
pub mod logger;

pub use errors::{Result, ShipperError};
