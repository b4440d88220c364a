//! Address list loading
//!
//! Reads a newline-separated list of URLs. Each line is trimmed and blank
//! lines are skipped; input order is preserved.

use std::path::Path;

use tracing::debug;

use crate::app::models::Address;
use crate::errors::AddressListError;

/// Parse addresses from the contents of an address list
pub fn parse_addresses(content: &str) -> Vec<Address> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Address::from)
        .collect()
}

/// Read and parse an address list file
///
/// # Errors
///
/// Returns `AddressListError::Read` if the file cannot be read and
/// `AddressListError::Empty` if it holds no addresses.
pub async fn load_addresses(path: &Path) -> Result<Vec<Address>, AddressListError> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AddressListError::Read {
                path: path.to_path_buf(),
                source,
            })?;

    let addresses = parse_addresses(&content);
    if addresses.is_empty() {
        return Err(AddressListError::Empty {
            path: path.to_path_buf(),
        });
    }

    debug!(
        "Loaded {} addresses from {}",
        addresses.len(),
        path.display()
    );
    Ok(addresses)
}
