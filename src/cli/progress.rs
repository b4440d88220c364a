//! Terminal progress display for a run
//!
//! The display subscribes to the aggregator's progress channel. On a
//! terminal it draws an indicatif bar; otherwise it prints a plain progress
//! line every few seconds so logs stay readable when output is redirected.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::coordinator::stats::format_bytes;
use crate::app::{ProgressAggregator, ProgressSnapshot};
use crate::constants::progress;
use crate::errors::{AppError, Result};

/// How often the text fallback reports
const TEXT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Live progress output for one run
pub struct ProgressDisplay {
    enabled: bool,
    is_terminal: bool,
    bar: Option<ProgressBar>,
    update_task: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Create a display; a disabled display prints nothing
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            is_terminal: atty::is(atty::Stream::Stderr),
            bar: None,
            update_task: None,
        }
    }

    /// Start following `aggregator`
    ///
    /// # Errors
    ///
    /// Returns `AppError::Generic` if the bar template is invalid
    pub fn start(&mut self, aggregator: &ProgressAggregator) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let updates = aggregator.subscribe();
        let total = aggregator.snapshot().total;

        if !self.is_terminal {
            self.update_task = Some(tokio::spawn(text_updates(updates)));
            return Ok(());
        }

        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
                .progress_chars("##-"),
        );
        bar.enable_steady_tick(progress::TICK_INTERVAL);

        self.update_task = Some(tokio::spawn(bar_updates(updates, bar.clone())));
        self.bar = Some(bar);
        debug!("Progress display started for {} transfers", total);
        Ok(())
    }

    /// Stop the display, leaving the final state on screen
    pub fn finish(mut self, last: ProgressSnapshot) {
        if let Some(task) = self.update_task.take() {
            task.abort();
        }
        if let Some(bar) = self.bar.take() {
            bar.set_position(last.completed as u64);
            bar.finish_with_message(bar_message(&last));
        }
    }
}

fn bar_message(snapshot: &ProgressSnapshot) -> String {
    format!("{} failed, {}", snapshot.failed, format_bytes(snapshot.bytes))
}

async fn bar_updates(mut updates: watch::Receiver<ProgressSnapshot>, bar: ProgressBar) {
    while updates.changed().await.is_ok() {
        let snapshot = *updates.borrow_and_update();
        bar.set_position(snapshot.completed as u64);
        bar.set_message(bar_message(&snapshot));
        if snapshot.is_complete() {
            break;
        }
    }
}

async fn text_updates(mut updates: watch::Receiver<ProgressSnapshot>) {
    let mut last_report = Instant::now();

    while updates.changed().await.is_ok() {
        let snapshot = *updates.borrow_and_update();
        if snapshot.is_complete() {
            break;
        }
        if last_report.elapsed() >= TEXT_REPORT_INTERVAL {
            eprintln!(
                "Progress: {}/{} transfers ({:.1}%), {} failed",
                snapshot.completed,
                snapshot.total,
                snapshot.completion_percentage(),
                snapshot.failed
            );
            last_report = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_message() {
        let snapshot = ProgressSnapshot {
            total: 3,
            completed: 2,
            failed: 1,
            bytes: 2048,
        };
        assert_eq!(bar_message(&snapshot), "1 failed, 2.0 KB");
    }

    #[tokio::test]
    async fn test_disabled_display_is_inert() {
        let aggregator = ProgressAggregator::new(1);
        let mut display = ProgressDisplay::new(false);
        display.start(&aggregator).unwrap();
        assert!(display.update_task.is_none());
        display.finish(aggregator.snapshot());
    }
}
