//! Error types for Bulk Fetcher
//!
//! Errors are split by the layer that produces them: fetching a resource,
//! writing to a sink, running one transfer, and scheduling a whole run.
//! Per-address errors (`FetchError`, `SinkError` during a transfer,
//! `TransferError`) never abort a run; only `SchedulerError` and
//! `ConfigError` are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching a remote resource
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, redirect limit, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection succeeded but the server answered with a non-success status
    #[error("Server responded with HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Address could not be parsed or has no file name component
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Run was cancelled before or during the fetch
    #[error("Transfer cancelled")]
    Cancelled,
}

/// Errors raised by a storage sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Local filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path exists but is not a directory
    #[error("Destination exists and is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// HTTP transport error talking to the WebHDFS gateway
    #[error("WebHDFS request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WebHDFS answered with a RemoteException or an unexpected status
    #[error("WebHDFS {operation} on {path} failed ({status}): {message}")]
    Remote {
        operation: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    /// WebHDFS redirect without a usable Location header
    #[error("WebHDFS {operation} redirect for {path} had no Location header")]
    MissingRedirect {
        operation: &'static str,
        path: String,
    },

    /// No namenode address configured or discoverable
    #[error("Cannot find a namenode to connect to. Set HADOOP_NAMENODE or pass --namenode")]
    NamenodeNotFound,

    /// Could not determine the user to act as on the cluster
    #[error("Unable to determine HDFS user. Set HADOOP_USER_NAME or pass --user")]
    UserNotFound,

    /// Namenode address could not be turned into a URL
    #[error("Invalid namenode address {address}: {reason}")]
    InvalidNamenode { address: String, reason: String },

    /// HDFS path with a `.` or `..` segment
    #[error("Invalid HDFS path {path}: dot segments are not allowed")]
    InvalidPath { path: String },
}

impl SinkError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from a single transfer; each maps to a recorded failure
#[derive(Error, Debug)]
pub enum TransferError {
    /// Sink could not create the destination object
    #[error("Failed to open destination: {0}")]
    Open(#[source] SinkError),

    /// Request could not be made or returned a bad status
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Copy failed after both ends were open
    #[error("Transfer interrupted after {bytes_written} bytes: {reason}")]
    Stream { bytes_written: u64, reason: String },

    /// Finishing the destination object failed
    #[error("Failed to close destination: {0}")]
    Close(#[source] SinkError),
}

impl TransferError {
    /// Short label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Open(_) => "open",
            TransferError::Fetch(FetchError::Status { .. }) => "status",
            TransferError::Fetch(FetchError::Cancelled) => "cancelled",
            TransferError::Fetch(_) => "fetch",
            TransferError::Stream { .. } => "stream",
            TransferError::Close(_) => "close",
        }
    }

    /// Check whether the failure was caused by cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Fetch(FetchError::Cancelled))
    }
}

/// Run-level errors; all of these are raised before any transfer starts
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Concurrency limit must be at least one
    #[error("Concurrency limit must be greater than 0 (got {limit})")]
    InvalidConcurrency { limit: usize },

    /// Destination container could not be created
    #[error("Failed to prepare destination {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: SinkError,
    },

    /// Two addresses map to the same target path and collisions are rejected
    #[error("Addresses {first} and {second} both write to {target}")]
    TargetCollision {
        first: String,
        second: String,
        target: PathBuf,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors reading the address list
#[derive(Error, Debug)]
pub enum AddressListError {
    /// Address file could not be read
    #[error("Failed to read address list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contained no addresses
    #[error("Address list {path} is empty")]
    Empty { path: PathBuf },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Scheduling error
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Sink bootstrap error
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Fetch client construction error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Address list error
    #[error(transparent)]
    Addresses(#[from] AddressListError),

    /// Run was interrupted before all transfers finished
    #[error("Run cancelled: {completed} of {total} transfers finished")]
    Cancelled { completed: usize, total: usize },

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Scheduler(SchedulerError::Setup { .. }) => "setup",
            AppError::Scheduler(_) => "config",
            AppError::Sink(_) => "sink",
            AppError::Fetch(_) => "fetch",
            AppError::Config(_) => "config",
            AppError::Addresses(_) => "input",
            AppError::Cancelled { .. } => "cancelled",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Sink result type alias
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Scheduler result type alias
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
