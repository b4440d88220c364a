//! Configuration management for Bulk Fetcher
//!
//! Settings come from an optional TOML file. Every section and field is
//! optional; anything missing falls back to the built-in defaults. Command
//! line flags and environment variables are applied on top by the CLI.
//!
//! ```toml
//! [transfer]
//! concurrency = 8
//! on_collision = "suffix"
//!
//! [client]
//! connect_timeout = "5s"
//! tcp_keepalive = "5s"
//!
//! [hdfs]
//! namenode = "nn1.example.com:9870,nn2.example.com:9870"
//! user = "etl"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CollisionPolicy, HdfsConfig, RunConfig};
use crate::constants::{config, http, transfer, webhdfs};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Scheduling settings
    pub transfer: TransferConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// HDFS sink settings
    pub hdfs: HdfsConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfigToml {
    /// Number of concurrent transfers
    pub concurrency: usize,
    /// Policy for addresses that map to the same file
    pub on_collision: CollisionPolicy,
}

impl Default for TransferConfigToml {
    fn default() -> Self {
        Self {
            concurrency: transfer::DEFAULT_CONCURRENCY,
            on_collision: CollisionPolicy::default(),
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Connect timeout (e.g. "5s")
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// TCP keep-alive interval (None = disabled)
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout (None = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Maximum redirect hops
    pub max_redirects: usize,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: 32,
            max_redirects: http::MAX_REDIRECTS,
        }
    }
}

/// TOML-friendly HDFS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HdfsConfigToml {
    /// WebHDFS namenode address(es), comma separated
    pub namenode: Option<String>,
    /// User to act as
    pub user: Option<String>,
    /// Bytes buffered per file before an APPEND
    pub append_buffer_size: usize,
}

impl Default for HdfsConfigToml {
    fn default() -> Self {
        Self {
            namenode: None,
            user: None,
            append_buffer_size: webhdfs::APPEND_BUFFER_SIZE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag or RUST_LOG is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl TransferConfigToml {
    pub fn to_runtime_config(&self) -> RunConfig {
        RunConfig::default()
            .with_concurrency(self.concurrency)
            .with_collision_policy(self.on_collision)
    }
}

impl ClientConfigToml {
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: self.connect_timeout,
            tcp_keepalive: self.tcp_keepalive,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            pool_max_per_host: self.pool_max_per_host,
            max_redirects: self.max_redirects,
        }
    }
}

impl HdfsConfigToml {
    /// HDFS settings; dial timeouts are shared with the HTTP client section
    pub fn to_runtime_config(&self, client: &ClientConfigToml) -> HdfsConfig {
        HdfsConfig {
            namenode: self.namenode.clone(),
            user: self.user.clone(),
            connect_timeout: client.connect_timeout,
            tcp_keepalive: client.tcp_keepalive,
            append_buffer_size: self.append_buffer_size,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (RunConfig, ClientConfig, HdfsConfig) {
        (
            self.transfer.to_runtime_config(),
            self.client.to_runtime_config(),
            self.hdfs.to_runtime_config(&self.client),
        )
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the first file found in
    /// the standard locations is used, and defaults apply if there is none.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(config::LOCAL_FILE_NAME)];
        if let Some(path) = Self::get_default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.is_file();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(config::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.transfer.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.concurrency".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.hdfs.append_buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hdfs.append_buffer_size".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1 byte".to_string(),
            });
        }

        if self.client.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "client.connect_timeout".to_string(),
                value: "0s".to_string(),
                reason: "A zero connect timeout fails every request".to_string(),
            });
        }

        Ok(())
    }
}
