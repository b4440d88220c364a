//! Progress aggregation for a run
//!
//! Every transfer task reports into one shared [`ProgressAggregator`].
//! Counters are atomics, the failure ledger sits behind a mutex, and each
//! update is published on a `watch` channel so presentation layers can
//! either poll [`ProgressAggregator::snapshot`] or subscribe.
//!
//! [`CompletionGuard`] makes sure a task is counted exactly once even if it
//! panics or is aborted before reporting.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::app::models::Address;
use crate::errors::TransferError;

/// Point-in-time view of a run's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Number of addresses in the run
    pub total: usize,
    /// Transfers that have reported, successful or not
    pub completed: usize,
    /// Transfers that failed
    pub failed: usize,
    /// Bytes written by successful transfers
    pub bytes: u64,
}

impl ProgressSnapshot {
    /// Transfers that succeeded so far
    pub fn succeeded(&self) -> usize {
        self.completed.saturating_sub(self.failed)
    }

    /// Calculate completion percentage
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    /// Check if every transfer has reported
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// One failed address and why it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransfer {
    pub address: Address,
    /// Short error label (`status`, `fetch`, `stream`, ...)
    pub kind: String,
    pub message: String,
}

/// Shared progress state of a run
#[derive(Debug)]
pub struct ProgressAggregator {
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
    failures: Mutex<Vec<FailedTransfer>>,
    updates: watch::Sender<ProgressSnapshot>,
}

impl ProgressAggregator {
    /// Create an aggregator for a run of `total` transfers
    pub fn new(total: usize) -> Self {
        let (updates, _) = watch::channel(ProgressSnapshot {
            total,
            ..Default::default()
        });

        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
            updates,
        }
    }

    /// Record a successful transfer of `bytes`
    pub fn record_success(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed transfer in the failure ledger
    ///
    /// This also counts the transfer as finished, so it replaces
    /// [`ProgressAggregator::record_unit_complete`] for failures.
    pub fn record_failure(&self, address: &Address, error: &TransferError) {
        warn!("Failed to transfer {}: {}", address, error);
        self.finish(Some(FailedTransfer {
            address: address.clone(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }));
    }

    /// Count one successful transfer as finished and publish the new state
    pub fn record_unit_complete(&self) {
        self.finish(None);
    }

    fn finish(&self, failure: Option<FailedTransfer>) {
        let failed = failure.is_some();
        if let Some(failure) = failure {
            self.failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(failure);
        }

        // Counters move inside the channel lock so the published value is
        // never stale; `completed` moves first so `failed <= completed`.
        self.updates.send_modify(|snapshot| {
            self.completed.fetch_add(1, Ordering::AcqRel);
            if failed {
                self.failed.fetch_add(1, Ordering::Release);
            }
            *snapshot = self.load();
        });
    }

    fn load(&self) -> ProgressSnapshot {
        // `failed` is read first; seeing an increment implies seeing its completion
        let failed = self.failed.load(Ordering::Acquire);
        ProgressSnapshot {
            total: self.total,
            completed: self.completed.load(Ordering::Acquire),
            failed,
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    /// Current progress
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.load()
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.updates.subscribe()
    }

    /// Wait until at least `total` transfers have completed
    pub async fn wait_for_all(&self, total: usize) {
        let mut updates = self.updates.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = updates.wait_for(|snapshot| snapshot.completed >= total).await;
    }

    /// Number of completed transfers
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Number of failed transfers
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    /// Copy of the failure ledger, in reporting order
    pub fn failures(&self) -> Vec<FailedTransfer> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Reports one transfer to the aggregator exactly once
///
/// Dropping the guard without calling [`CompletionGuard::succeed`] or
/// [`CompletionGuard::fail`] records the transfer as aborted.
#[derive(Debug)]
pub struct CompletionGuard {
    aggregator: Arc<ProgressAggregator>,
    address: Address,
    reported: bool,
}

impl CompletionGuard {
    pub fn new(aggregator: Arc<ProgressAggregator>, address: Address) -> Self {
        Self {
            aggregator,
            address,
            reported: false,
        }
    }

    /// Report success and count the transfer as complete
    pub fn succeed(mut self, bytes: u64) {
        self.aggregator.record_success(bytes);
        self.aggregator.record_unit_complete();
        self.reported = true;
    }

    /// Report failure and count the transfer as complete
    pub fn fail(mut self, error: &TransferError) {
        self.aggregator.record_failure(&self.address, error);
        self.reported = true;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        warn!("Transfer of {} ended without reporting", self.address);
        self.aggregator.finish(Some(FailedTransfer {
            address: self.address.clone(),
            kind: "aborted".to_string(),
            message: "transfer task ended without reporting an outcome".to_string(),
        }));
    }
}
