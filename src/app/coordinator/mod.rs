//! Fan-out scheduling of transfers
//!
//! The scheduler takes an ordered list of addresses and runs one transfer
//! per address, never more than N at a time. It is the control plane of a
//! run; the data plane lives in [`crate::app::transfer`].
//!
//! # Key Features
//!
//! - **Bounded Fan-Out**: one tokio task per address, gated by a semaphore
//!   of N permits acquired before any I/O
//! - **Single Setup**: the destination container is created once before
//!   anything is dispatched
//! - **Exact Accounting**: every address is reported exactly once, even when
//!   its task panics or the run is cancelled
//! - **Graceful Cancellation**: a cancelled run still drains to a full report
//!
//! # Architecture
//!
//! - [`config`] - run configuration and validation
//! - [`progress`] - shared counters, failure ledger and progress channel
//! - [`stats`] - the final run report
//! - [`signals`] - CTRL-C / SIGTERM to cancellation token
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use bulk_fetcher::app::{Address, ClientConfig, HttpSource, LocalSink, RunConfig, Scheduler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(HttpSource::new(&ClientConfig::default())?);
//! let scheduler = Scheduler::new(RunConfig::default().with_concurrency(4), source);
//!
//! let addresses = vec![Address::from("https://example.com/a.txt")];
//! let report = scheduler
//!     .run(&addresses, Arc::new(LocalSink::new()), Path::new("out"), CancellationToken::new())
//!     .await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod progress;
pub mod signals;
pub mod stats;

#[cfg(test)]
pub mod tests;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::client::TransferSource;
use crate::app::models::{plan_targets, Address, TransferPlan};
use crate::app::sink::Sink;
use crate::app::transfer::{TransferOutcome, TransferTask};
use crate::errors::{FetchError, SchedulerError, SchedulerResult, TransferError};

pub use config::RunConfig;
pub use progress::{CompletionGuard, FailedTransfer, ProgressAggregator, ProgressSnapshot};
pub use signals::SignalHandler;
pub use stats::RunReport;

/// Runs transfers with bounded concurrency
#[derive(Debug)]
pub struct Scheduler {
    config: RunConfig,
    source: Arc<dyn TransferSource>,
    aggregator: Option<Arc<ProgressAggregator>>,
}

impl Scheduler {
    /// Create a scheduler fetching through `source`
    pub fn new(config: RunConfig, source: Arc<dyn TransferSource>) -> Self {
        Self {
            config,
            source,
            aggregator: None,
        }
    }

    /// Report into an aggregator owned by the caller
    ///
    /// Lets a presentation layer subscribe before the run starts. The
    /// aggregator must be sized for the address list passed to `run`.
    pub fn with_aggregator(mut self, aggregator: Arc<ProgressAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Transfer every address into `sink` under `root`
    ///
    /// Blocks until every address has reported an outcome. Per-address
    /// failures are collected in the report and never abort the run.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` before anything is dispatched if the
    /// concurrency limit is zero, the destination container cannot be
    /// prepared, or two targets collide under `CollisionPolicy::Error`.
    pub async fn run(
        &self,
        addresses: &[Address],
        sink: Arc<dyn Sink>,
        root: &Path,
        cancel: CancellationToken,
    ) -> SchedulerResult<RunReport> {
        if self.config.validate().is_err() {
            return Err(SchedulerError::InvalidConcurrency {
                limit: self.config.concurrency,
            });
        }

        let started_at = chrono::Utc::now();
        let start = Instant::now();

        if let Err(source) = sink.ensure_container(root).await {
            error!("Failed to prepare {} destination {}: {}", sink.name(), root.display(), source);
            return Err(SchedulerError::Setup {
                path: root.to_path_buf(),
                source,
            });
        }

        let plans = plan_targets(addresses, root, self.config.collision_policy)?;
        let total = plans.len();
        let aggregator = self
            .aggregator
            .clone()
            .unwrap_or_else(|| Arc::new(ProgressAggregator::new(total)));

        info!(
            "Transferring {} addresses to {} destination {} ({} at a time)",
            total,
            sink.name(),
            root.display(),
            self.config.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let task = TransferTask::new(Arc::clone(&self.source), sink);
        let mut tasks = JoinSet::new();

        for plan in plans {
            tasks.spawn(run_one(
                plan,
                task.clone(),
                Arc::clone(&semaphore),
                Arc::clone(&aggregator),
                cancel.clone(),
            ));
        }

        aggregator.wait_for_all(total).await;

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                // Already counted by its completion guard
                warn!("Transfer task ended abnormally: {}", e);
            }
        }

        let report = RunReport::from_snapshot(
            aggregator.snapshot(),
            aggregator.failures(),
            cancel.is_cancelled(),
            start.elapsed(),
            started_at,
        );
        info!("{}", report.summary());
        Ok(report)
    }
}

/// Body of one spawned transfer task
async fn run_one(
    plan: TransferPlan,
    task: TransferTask,
    semaphore: Arc<Semaphore>,
    aggregator: Arc<ProgressAggregator>,
    cancel: CancellationToken,
) {
    let guard = CompletionGuard::new(aggregator, plan.address.clone());

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let permit = match permit {
        Some(permit) => permit,
        None => {
            debug!("Transfer of {} cancelled before it started", plan.address);
            guard.fail(&TransferError::Fetch(FetchError::Cancelled));
            return;
        }
    };

    match task.run(&plan, &cancel).await {
        TransferOutcome::Succeeded { bytes } => guard.succeed(bytes),
        TransferOutcome::Failed { error } => guard.fail(&error),
    }

    drop(permit);
}
