//! Command-line interface components
//!
//! This module contains CLI-specific code for the Bulk Fetcher application:
//! argument parsing, the command handlers and the progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, GlobalArgs, HdfsArgs};
pub use commands::{exit_code, handle_hdfs, handle_local, run_transfers, RunSettings};
pub use progress::ProgressDisplay;
