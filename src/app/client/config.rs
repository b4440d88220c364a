//! HTTP client configuration and building logic
//!
//! Every dial made by the transfer source uses the same short connect
//! timeout and TCP keep-alive. There is no overall request deadline.

use std::time::Duration;

use reqwest::Client;

use super::http::redirect_policy;
use crate::constants::http;
use crate::errors::{FetchError, FetchResult};

/// Configuration for the transfer HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect timeout applied to every dial
    pub connect_timeout: Duration,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections kept per host
    pub pool_max_per_host: usize,
    /// Maximum redirect hops before the request fails
    pub max_redirects: usize,
}

impl Default for ClientConfig {
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

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> FetchResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host)
            .redirect(redirect_policy(self.max_redirects));

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(FetchError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.tcp_keepalive, Some(Duration::from_secs(5)));
        assert_eq!(config.max_redirects, http::MAX_REDIRECTS);
    }

    #[test]
    fn test_http_client_creation() {
        let config = ClientConfig::default();
        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_http_client_without_keepalive() {
        let config = ClientConfig {
            tcp_keepalive: None,
            pool_idle_timeout: None,
            ..Default::default()
        };
        assert!(config.build_http_client().is_ok());
    }
}
