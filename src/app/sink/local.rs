//! Local filesystem sink

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{Sink, SinkWriter};
use crate::constants::transfer;
use crate::errors::{SinkError, SinkResult};

/// Sink writing into local directories
#[derive(Debug, Clone, Default)]
pub struct LocalSink {
    buffer_capacity: Option<usize>,
}

impl LocalSink {
    /// Create a local sink with the default write buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-file write buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }
}

#[async_trait]
impl Sink for LocalSink {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn ensure_container(&self, path: &Path) -> SinkResult<()> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                debug!("Destination {} already exists", path.display());
                Ok(())
            }
            Ok(_) => Err(SinkError::NotADirectory {
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|e| SinkError::io(path, e))?;
                debug!("Created destination {}", path.display());
                Ok(())
            }
            Err(e) => Err(SinkError::io(path, e)),
        }
    }

    async fn create_writer(&self, path: &Path) -> SinkResult<Box<dyn SinkWriter>> {
        let file = File::create(path)
            .await
            .map_err(|e| SinkError::io(path, e))?;
        let capacity = self
            .buffer_capacity
            .unwrap_or(transfer::LOCAL_WRITE_BUFFER);

        Ok(Box::new(LocalWriter {
            path: path.to_path_buf(),
            file: BufWriter::with_capacity(capacity, file),
            bytes_written: 0,
        }))
    }
}

/// Buffered writer over a local file
#[derive(Debug)]
pub struct LocalWriter {
    path: PathBuf,
    file: BufWriter<File>,
    bytes_written: u64,
}

#[async_trait]
impl SinkWriter for LocalWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> SinkResult<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> SinkResult<()> {
        self.file
            .shutdown()
            .await
            .map_err(|e| SinkError::io(&self.path, e))
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
