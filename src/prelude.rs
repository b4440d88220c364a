//! Prelude module for Bulk Fetcher Library
//!
//! Re-exports the items needed for a typical run with a single
//! `use bulk_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bulk_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = Arc::new(HttpSource::new(&ClientConfig::default())?);
//!     let scheduler = Scheduler::new(RunConfig::default(), source);
//!     let addresses = vec![Address::from("https://example.com/a.txt")];
//!
//!     let report = scheduler
//!         .run(&addresses, Arc::new(LocalSink::new()), Path::new("out"), CancellationToken::new())
//!         .await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    Address, ClientConfig, CollisionPolicy, HdfsConfig, HdfsOverrides, HttpSource, LocalSink,
    ProgressAggregator, RunConfig, RunReport, Scheduler, Sink, TransferSource, WebHdfsSink,
    load_addresses,
};
pub use crate::config::AppConfig;

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
pub use tokio_util::sync::CancellationToken;
