//! Command handlers for Bulk Fetcher CLI
//!
//! Both destination commands share the same flow: resolve settings, read
//! the address list, prepare the sink, run the scheduler with a progress
//! display, then print the summary. They differ only in the sink they build.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::coordinator::stats::format_duration;
use crate::app::{
    load_addresses, Address, ClientConfig, HdfsConfig, HdfsOverrides, HttpSource, LocalSink,
    ProgressAggregator, RunConfig, RunReport, Scheduler, SignalHandler, Sink, WebHdfsSink,
};
use crate::cli::{GlobalArgs, HdfsArgs, ProgressDisplay};
use crate::config::AppConfig;
use crate::constants::{exit, progress, COMPLETION_BANNER};
use crate::errors::{AppError, ConfigError, Result, SchedulerError};

/// Settings of one run after merging flags over the config file
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub file: PathBuf,
    pub destination: PathBuf,
    pub run: RunConfig,
    pub client: ClientConfig,
    pub hdfs: HdfsConfig,
    pub quiet: bool,
}

impl RunSettings {
    /// Merge command line flags over the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if the address file or the
    /// destination is missing, and `SchedulerError::InvalidConcurrency` for
    /// a zero concurrency limit.
    pub fn resolve(global: &GlobalArgs, config: &AppConfig) -> Result<Self> {
        let (mut run, client, hdfs) = config.to_runtime_config();

        if let Some(concurrency) = global.concurrent {
            run = run.with_concurrency(concurrency);
        }
        if let Some(policy) = global.on_collision {
            run = run.with_collision_policy(policy);
        }
        if run.validate().is_err() {
            return Err(SchedulerError::InvalidConcurrency {
                limit: run.concurrency,
            }
            .into());
        }

        let file = global.file.clone().ok_or_else(|| ConfigError::MissingField {
            field: "--file".to_string(),
        })?;
        let destination = global
            .destination
            .clone()
            .ok_or_else(|| ConfigError::MissingField {
                field: "--destination".to_string(),
            })?;

        Ok(Self {
            file,
            destination,
            run,
            client,
            hdfs,
            quiet: global.quiet,
        })
    }
}

/// Handle the local command
pub async fn handle_local(global: &GlobalArgs, config: &AppConfig) -> Result<i32> {
    let settings = RunSettings::resolve(global, config)?;
    let addresses = load_addresses(&settings.file).await?;

    let sink = Arc::new(LocalSink::new());
    run_transfers(&settings, &addresses, sink).await
}

/// Handle the hdfs command
pub async fn handle_hdfs(global: &GlobalArgs, args: HdfsArgs, config: &AppConfig) -> Result<i32> {
    let settings = RunSettings::resolve(global, config)?;
    let addresses = load_addresses(&settings.file).await?;

    let overrides = HdfsOverrides {
        namenode: args.namenode,
        user: args.user,
    };
    let sink = Arc::new(WebHdfsSink::connect(&settings.hdfs, &overrides).await?);
    run_transfers(&settings, &addresses, sink).await
}

/// Run the scheduler with progress output and print the outcome
///
/// Returns the process exit code for a run that completed.
pub async fn run_transfers(
    settings: &RunSettings,
    addresses: &[Address],
    sink: Arc<dyn Sink>,
) -> Result<i32> {
    info!(
        "Starting {} transfers into {} ({} concurrent)",
        addresses.len(),
        settings.destination.display(),
        settings.run.concurrency
    );

    let source = Arc::new(HttpSource::new(&settings.client)?);
    let aggregator = Arc::new(ProgressAggregator::new(addresses.len()));
    let cancel = CancellationToken::new();
    let signals = SignalHandler::new(cancel.clone()).setup();

    let mut display = ProgressDisplay::new(!settings.quiet);
    display.start(&aggregator)?;

    let result = Scheduler::new(settings.run, source)
        .with_aggregator(Arc::clone(&aggregator))
        .run(addresses, sink, &settings.destination, cancel.clone())
        .await;

    display.finish(aggregator.snapshot());
    signals.abort();
    let report = result?;

    if !settings.quiet {
        print_summary(&report);
    }

    if report.cancelled {
        return Err(AppError::Cancelled {
            completed: report.succeeded(),
            total: report.total,
        });
    }

    if !settings.quiet {
        println!("{}", COMPLETION_BANNER);
    }

    Ok(exit_code(&report))
}

/// Exit code for a run that was not cancelled
pub fn exit_code(report: &RunReport) -> i32 {
    if report.failed > 0 {
        exit::TRANSFERS_FAILED
    } else {
        0
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", report.summary());
    println!(
        "  Started: {}  Elapsed: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(report.duration)
    );

    if report.failures.is_empty() {
        return;
    }

    println!();
    println!("Failed transfers:");
    for failure in report.failures.iter().take(progress::MAX_LISTED_FAILURES) {
        println!("  [{}] {}: {}", failure.kind, failure.address, failure.message);
    }
    if report.failures.len() > progress::MAX_LISTED_FAILURES {
        println!(
            "  ... and {} more (run with -v to log every failure)",
            report.failures.len() - progress::MAX_LISTED_FAILURES
        );
    }
}
