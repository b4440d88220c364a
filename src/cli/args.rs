//! Command-line argument parsing for Bulk Fetcher
//!
//! The transfer flags are global so they can be given before or after the
//! destination subcommand, e.g. `bulk_fetcher -f urls.txt -c 8 -d out local`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::CollisionPolicy;

/// Bulk Fetcher - download a list of URLs into a local directory or HDFS
#[derive(Parser, Debug)]
#[command(
    name = "bulk_fetcher",
    version,
    about = "Download a list of URLs in parallel into a local directory or HDFS",
    long_about = "Reads one URL per line from a file and writes each resource into the destination,
running a bounded number of transfers at a time. Failed transfers are listed at the end and are
never retried."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Destination backend
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// File with one URL per line
    #[arg(short, long, global = true, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Number of concurrent transfers [default: 1]
    #[arg(short = 'c', long = "concurrent", global = true, value_name = "N")]
    pub concurrent: Option<usize>,

    /// Destination directory (local path or HDFS path)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// What to do when two URLs end in the same file name
    #[arg(long, global = true, value_name = "POLICY")]
    pub on_collision: Option<CollisionPolicy>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress progress and summary output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available destinations
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write into a local directory
    Local,

    /// Write into HDFS through WebHDFS
    Hdfs(HdfsArgs),
}

/// Arguments for the hdfs command
#[derive(Args, Debug, Clone, Default)]
pub struct HdfsArgs {
    /// WebHDFS namenode address, host[:port]; comma separate HA namenodes
    #[arg(long, value_name = "ADDR")]
    pub namenode: Option<String>,

    /// User to act as on the cluster
    #[arg(long)]
    pub user: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
