//! Transfer sources
//!
//! A transfer source turns an address into a stream of body bytes. The
//! scheduler only depends on the `TransferSource` trait; `HttpSource` is the
//! production implementation.
//!
//! The module is organized into:
//! - `config`: HTTP client configuration and building
//! - `http`: the reqwest-backed source and its redirect policy

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::app::models::Address;
use crate::errors::FetchResult;

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::{redirect_policy, HttpSource};

/// Body of a fetched resource
pub type ByteStream = Pin<Box<dyn Stream<Item = FetchResult<Bytes>> + Send>>;

/// Produces the body of a remote resource
#[async_trait]
pub trait TransferSource: Send + Sync + std::fmt::Debug {
    /// Request `address` and return its body once the response is known good
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` on transport failure,
    /// `FetchError::Status` on a non-success response and
    /// `FetchError::InvalidAddress` if the address is not a URL.
    async fn open(&self, address: &Address) -> FetchResult<ByteStream>;
}
