//! Run report
//!
//! The final statistics of a run, produced by the scheduler once every
//! transfer has reported.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progress::{FailedTransfer, ProgressSnapshot};

/// Final result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of addresses in the run
    pub total: usize,
    /// Transfers that reported (equals `total` after a run)
    pub completed: usize,
    /// Transfers that failed
    pub failed: usize,
    /// Bytes written by successful transfers
    pub bytes: u64,
    /// Every failed address with its error
    pub failures: Vec<FailedTransfer>,
    /// Whether the run was interrupted
    pub cancelled: bool,
    /// Wall-clock time of the run
    pub duration: Duration,
    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl RunReport {
    /// Build a report from the final progress state
    pub fn from_snapshot(
        snapshot: ProgressSnapshot,
        failures: Vec<FailedTransfer>,
        cancelled: bool,
        duration: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            total: snapshot.total,
            completed: snapshot.completed,
            failed: snapshot.failed,
            bytes: snapshot.bytes,
            failures,
            cancelled,
            duration,
            started_at,
        }
    }

    /// Transfers that succeeded
    pub fn succeeded(&self) -> usize {
        self.completed.saturating_sub(self.failed)
    }

    /// Check if every transfer succeeded
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.completed == self.total
    }

    /// Average throughput over the run, in bytes per second
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }

    /// Get a one-line summary of the run
    pub fn summary(&self) -> String {
        let state = if self.cancelled {
            "Run cancelled"
        } else if self.failed == 0 {
            "Run completed successfully"
        } else {
            "Run completed with failures"
        };

        format!(
            "{}: {} of {} transferred, {} failed, {} in {} ({})",
            state,
            self.succeeded(),
            self.total,
            self.failed,
            format_bytes(self.bytes),
            format_duration(self.duration),
            format_rate(self.throughput_bps())
        )
    }
}

/// Format a byte count as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{} B", bytes)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.1} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.1} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_rate(bps: f64) -> String {
    if bps < 1024.0 {
        format!("{:.1} B/s", bps)
    } else if bps < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", bps / 1024.0)
    } else {
        format!("{:.1} MB/s", bps / (1024.0 * 1024.0))
    }
}

/// Format a duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Address;

    fn report(failed: usize, cancelled: bool) -> RunReport {
        let failures = (0..failed)
            .map(|i| FailedTransfer {
                address: Address::new(format!("http://h/{}", i)),
                kind: "status".to_string(),
                message: "HTTP 404".to_string(),
            })
            .collect();

        RunReport::from_snapshot(
            ProgressSnapshot {
                total: 4,
                completed: 4,
                failed,
                bytes: 2048,
            },
            failures,
            cancelled,
            Duration::from_secs(2),
            Utc::now(),
        )
    }

    /// Test report success classification
    #[test]
    fn test_report_outcomes() {
        let clean = report(0, false);
        assert!(clean.is_success());
        assert_eq!(clean.succeeded(), 4);
        assert!(clean.summary().contains("completed successfully"));

        let partial = report(1, false);
        assert!(!partial.is_success());
        assert_eq!(partial.succeeded(), 3);
        assert!(partial.summary().contains("1 failed"));

        let cancelled = report(2, true);
        assert!(!cancelled.is_success());
        assert!(cancelled.summary().starts_with("Run cancelled"));
    }

    /// Test human-readable formatting helpers
    #[test]
    fn test_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h1m");
        assert_eq!(report(0, false).throughput_bps(), 1024.0);
    }
}
