//! Application constants for Bulk Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Namenode address override (host:port of the WebHDFS endpoint)
    pub const HADOOP_NAMENODE: &str = "HADOOP_NAMENODE";

    /// User to act as on the cluster
    pub const HADOOP_USER_NAME: &str = "HADOOP_USER_NAME";

    /// Login user fallbacks, checked in order
    pub const LOGIN_USER_VARS: [&str; 2] = ["USER", "USERNAME"];
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("bulk-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout, applied to every dial
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// TCP keep-alive interval, applied to every dial
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(5);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Transfer scheduling defaults
pub mod transfer {
    /// Default number of concurrent transfers
    pub const DEFAULT_CONCURRENCY: usize = 1;

    /// Capacity of the local file write buffer
    pub const LOCAL_WRITE_BUFFER: usize = 64 * 1024;
}

/// WebHDFS protocol constants
pub mod webhdfs {
    /// REST prefix for all WebHDFS operations
    pub const API_PREFIX: &str = "/webhdfs/v1";

    /// Default WebHDFS HTTP port when the namenode address has none
    pub const DEFAULT_PORT: u16 = 9870;

    /// Permission used when creating directories
    pub const DIR_PERMISSION: &str = "755";

    /// Bytes buffered before an APPEND request is issued
    pub const APPEND_BUFFER_SIZE: usize = 8 * 1024 * 1024;
}

/// Progress reporting constants
pub mod progress {
    use super::Duration;

    /// Refresh interval for the terminal progress bar
    pub const TICK_INTERVAL: Duration = Duration::from_millis(120);

    /// Number of failed addresses listed in the run summary
    pub const MAX_LISTED_FAILURES: usize = 20;
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE_NAME: &str = "bulk-fetcher.toml";

    /// Directory under the user config dir
    pub const APP_DIR_NAME: &str = "bulk-fetcher";
}

/// Process exit codes
pub mod exit {
    /// A fatal error prevented the run from completing
    pub const FATAL: i32 = 1;

    /// Run completed but at least one transfer failed
    pub const TRANSFERS_FAILED: i32 = 2;
}

/// Banner printed once a run finishes
pub const COMPLETION_BANNER: &str = r#"
  +------------------------------------+
  |                                    |
  |        ALL TRANSFERS FINISHED      |
  |                                    |
  +------------------------------------+
"#;
