//! Bulk Fetcher Library
//!
//! Fetches a list of HTTP resources and writes each one to a local directory
//! or to HDFS, running a bounded number of transfers in parallel and
//! reporting aggregate progress and per-address failures.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
