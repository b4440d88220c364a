//! Single-address transfer
//!
//! A [`TransferTask`] copies one remote resource into one sink object:
//! open the writer, request the address, stream the body into the writer,
//! close the writer. The writer is closed on every path once it has been
//! opened, and partial output is left in place when the copy fails.
//!
//! There are no retries. Cancellation is observed while the request is
//! being made and before every chunk read.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::app::client::TransferSource;
use crate::app::models::{Address, TransferPlan};
use crate::app::sink::{Sink, SinkWriter};
use crate::errors::{FetchError, TransferError, TransferResult};

/// Result of one transfer
#[derive(Debug)]
pub enum TransferOutcome {
    /// Body fully written and the writer closed
    Succeeded { bytes: u64 },
    /// Transfer failed at some stage
    Failed { error: TransferError },
}

impl From<TransferResult<u64>> for TransferOutcome {
    fn from(result: TransferResult<u64>) -> Self {
        match result {
            Ok(bytes) => TransferOutcome::Succeeded { bytes },
            Err(error) => TransferOutcome::Failed { error },
        }
    }
}

/// Copies addresses from a source into a sink
#[derive(Debug, Clone)]
pub struct TransferTask {
    source: Arc<dyn TransferSource>,
    sink: Arc<dyn Sink>,
}

impl TransferTask {
    pub fn new(source: Arc<dyn TransferSource>, sink: Arc<dyn Sink>) -> Self {
        Self { source, sink }
    }

    /// Run the transfer described by `plan`
    pub async fn run(&self, plan: &TransferPlan, cancel: &CancellationToken) -> TransferOutcome {
        let result = self.transfer(plan, cancel).await;
        match &result {
            Ok(bytes) => debug!("Transferred {} ({} bytes)", plan.address, bytes),
            Err(e) => debug!("Transfer of {} failed: {}", plan.address, e),
        }
        result.into()
    }

    async fn transfer(&self, plan: &TransferPlan, cancel: &CancellationToken) -> TransferResult<u64> {
        let target = plan
            .target
            .as_deref()
            .ok_or_else(|| FetchError::InvalidAddress {
                address: plan.address.to_string(),
                reason: "address does not name a file".to_string(),
            })?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled.into());
        }

        let mut writer = self
            .sink
            .create_writer(target)
            .await
            .map_err(TransferError::Open)?;
        trace!("Opened {} for {}", target.display(), plan.address);

        match self.copy(&plan.address, writer.as_mut(), cancel).await {
            Ok(()) => {
                let bytes = writer.bytes_written();
                writer.close().await.map_err(TransferError::Close)?;
                Ok(bytes)
            }
            Err(error) => {
                if let Err(close_error) = writer.close().await {
                    debug!(
                        "Closing {} after a failed transfer also failed: {}",
                        target.display(),
                        close_error
                    );
                }
                Err(error)
            }
        }
    }

    async fn copy(
        &self,
        address: &Address,
        writer: &mut dyn SinkWriter,
        cancel: &CancellationToken,
    ) -> TransferResult<()> {
        let mut body = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled.into()),
            opened = self.source.open(address) => opened?,
        };

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled.into()),
                next = body.next() => next,
            };

            match next {
                None => return Ok(()),
                Some(Ok(chunk)) => {
                    writer
                        .write_chunk(&chunk)
                        .await
                        .map_err(|e| TransferError::Stream {
                            bytes_written: writer.bytes_written(),
                            reason: e.to_string(),
                        })?;
                }
                Some(Err(e)) => {
                    return Err(TransferError::Stream {
                        bytes_written: writer.bytes_written(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
