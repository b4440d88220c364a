//! HTTP transfer source
//!
//! Issues a single GET per address and hands back the body as a byte
//! stream. There are no retries: any transport error or non-success status
//! is returned to the caller as-is.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::redirect::{Attempt, Policy};
use reqwest::Client;
use tracing::{debug, trace};
use url::Url;

use super::{ByteStream, ClientConfig, TransferSource};
use crate::app::models::Address;
use crate::errors::{FetchError, FetchResult};

/// Redirect policy used by every transfer request
///
/// Location headers are taken as already escaped: `Url` keeps existing
/// percent-escapes in the path, so a hop never double-encodes it.
pub fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() > max_redirects {
            let message = format!("too many redirects (limit {})", max_redirects);
            return attempt.error(message);
        }

        trace!(
            "Following redirect to {} (hop {})",
            attempt.url(),
            attempt.previous().len()
        );
        attempt.follow()
    })
}

/// Transfer source backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Create a source with the given client configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the client cannot be built
    pub fn new(config: &ClientConfig) -> FetchResult<Self> {
        Ok(Self {
            client: config.build_http_client()?,
        })
    }
}

#[async_trait]
impl TransferSource for HttpSource {
    async fn open(&self, address: &Address) -> FetchResult<ByteStream> {
        let url = Url::parse(address.as_str()).map_err(|e| FetchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            "GET {} -> {} ({:?} bytes)",
            address,
            status,
            response.content_length()
        );

        Ok(Box::pin(response.bytes_stream().map_err(FetchError::Http)))
    }
}
