//! File system helpers for locating candidate log files.

pub mod candidates;

pub use candidates::{find_candidates, is_log_file};
