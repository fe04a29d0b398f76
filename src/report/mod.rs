//! Run reporting for grazing feature extraction.
//!
//! Each extraction run records what it read, dropped and produced, and the
//! report of the last run is kept on disk for the `status` command.

pub mod log;

// Re-export commonly used types
pub use log::{ReportStats, RunReport};
