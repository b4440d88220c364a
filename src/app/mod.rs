//! Core application logic for Bulk Fetcher
//!
//! This module contains the transfer pipeline: the address list, the HTTP
//! transfer source, the storage sinks, the per-address transfer task and the
//! fan-out scheduler that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use bulk_fetcher::app::{load_addresses, ClientConfig, HttpSource, LocalSink, RunConfig, Scheduler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let addresses = load_addresses(Path::new("urls.txt")).await?;
//! let source = Arc::new(HttpSource::new(&ClientConfig::default())?);
//!
//! let report = Scheduler::new(RunConfig::default().with_concurrency(8), source)
//!     .run(&addresses, Arc::new(LocalSink::new()), Path::new("downloads"), CancellationToken::new())
//!     .await?;
//!
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.address, failure.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod addresses;
pub mod client;
pub mod coordinator;
pub mod models;
pub mod sink;
pub mod transfer;

// Re-export main public API
pub use addresses::{load_addresses, parse_addresses};
pub use client::{ByteStream, ClientConfig, HttpSource, TransferSource};
pub use coordinator::{
    FailedTransfer, ProgressAggregator, ProgressSnapshot, RunConfig, RunReport, Scheduler,
    SignalHandler,
};
pub use models::{plan_targets, Address, CollisionPolicy, TransferPlan};
pub use sink::{
    HdfsConfig, HdfsEndpoint, HdfsOverrides, LocalSink, Sink, SinkWriter, WebHdfsClient,
    WebHdfsSink,
};
pub use transfer::{TransferOutcome, TransferTask};
