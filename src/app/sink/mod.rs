//! Storage sinks
//!
//! A sink is the destination store of a run. It offers two capabilities:
//! making sure the destination container exists, and opening a writable
//! handle at a path. Transfers and the scheduler only ever see
//! `Arc<dyn Sink>`, never a concrete backend.
//!
//! - [`local`] - the local filesystem
//! - [`webhdfs`] - HDFS through the WebHDFS REST gateway

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::errors::SinkResult;

pub mod local;
pub mod webhdfs;

pub use local::{LocalSink, LocalWriter};
pub use webhdfs::{HdfsConfig, HdfsEndpoint, HdfsOverrides, WebHdfsClient, WebHdfsSink, WebHdfsWriter};

/// Destination store for fetched resources
#[async_trait]
pub trait Sink: Send + Sync + fmt::Debug {
    /// Backend name for logs and summaries
    fn name(&self) -> &'static str;

    /// Make sure the container at `path` exists, creating missing parents
    ///
    /// Calling this on an existing container is a no-op.
    async fn ensure_container(&self, path: &Path) -> SinkResult<()>;

    /// Create (or truncate) the object at `path` and open it for writing
    async fn create_writer(&self, path: &Path) -> SinkResult<Box<dyn SinkWriter>>;
}

/// Append-only handle to one destination object
///
/// A writer is owned by exactly one transfer. It must be closed explicitly;
/// `close` consumes it so it cannot be closed twice.
#[async_trait]
pub trait SinkWriter: Send {
    /// Append `chunk` to the object
    async fn write_chunk(&mut self, chunk: &[u8]) -> SinkResult<()>;

    /// Flush buffered data and release the handle
    async fn close(self: Box<Self>) -> SinkResult<()>;

    /// Bytes accepted so far
    fn bytes_written(&self) -> u64;
}
