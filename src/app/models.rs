//! Data models for Bulk Fetcher
//!
//! This module defines the work items handled by the scheduler: addresses,
//! the target paths derived from them, and the policy applied when two
//! addresses derive the same target.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SchedulerError, SchedulerResult};

/// An opaque remote resource address (URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from any string-like value
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Borrow the raw address string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name derived from the address: everything after the last `/`
    ///
    /// Query strings and fragments are kept as part of the name. Returns
    /// `None` when the address ends with `/` and so names nothing.
    pub fn file_name(&self) -> Option<&str> {
        let name = match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => self.0.as_str(),
        };

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Target path of this address under `root`
    pub fn target_path(&self, root: &Path) -> Option<PathBuf> {
        self.file_name().map(|name| root.join(name))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What to do when two addresses derive the same target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Let every transfer write; the last writer wins
    #[default]
    Overwrite,
    /// Reject the run before anything is dispatched
    Error,
    /// Give later duplicates a numbered name (`name.1.ext`, `name.2.ext`, ...)
    Suffix,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "error" => Ok(Self::Error),
            "suffix" => Ok(Self::Suffix),
            other => Err(format!(
                "unknown collision policy '{}' (expected overwrite, error or suffix)",
                other
            )),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Overwrite => "overwrite",
            Self::Error => "error",
            Self::Suffix => "suffix",
        };
        f.write_str(name)
    }
}

/// One scheduled transfer: an address and where it will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Position in the input list
    pub index: usize,
    /// Address to fetch
    pub address: Address,
    /// Destination path, `None` when the address names no file
    pub target: Option<PathBuf>,
}

/// Derive the target path of every address under `root`
///
/// Addresses without a file name keep `target: None` and fail individually
/// when their transfer runs.
///
/// # Errors
///
/// Returns `SchedulerError::TargetCollision` if `policy` is
/// `CollisionPolicy::Error` and two addresses share a target.
pub fn plan_targets(
    addresses: &[Address],
    root: &Path,
    policy: CollisionPolicy,
) -> SchedulerResult<Vec<TransferPlan>> {
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    let mut taken: HashSet<PathBuf> = addresses
        .iter()
        .filter_map(|address| address.target_path(root))
        .collect();
    let mut plans = Vec::with_capacity(addresses.len());

    for (index, address) in addresses.iter().enumerate() {
        let target = match address.target_path(root) {
            Some(path) => path,
            None => {
                plans.push(TransferPlan {
                    index,
                    address: address.clone(),
                    target: None,
                });
                continue;
            }
        };

        let target = match claimed.get(&target) {
            None => target,
            Some(&first) => match policy {
                CollisionPolicy::Overwrite => target,
                CollisionPolicy::Error => {
                    return Err(SchedulerError::TargetCollision {
                        first: addresses[first].to_string(),
                        second: address.to_string(),
                        target,
                    });
                }
                CollisionPolicy::Suffix => {
                    let renamed = next_free_name(&target, &taken);
                    taken.insert(renamed.clone());
                    renamed
                }
            },
        };

        claimed.entry(target.clone()).or_insert(index);
        plans.push(TransferPlan {
            index,
            address: address.clone(),
            target: Some(target),
        });
    }

    Ok(plans)
}

/// First `name.N.ext` variant of `target` not present in `taken`
fn next_free_name(target: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    let mut n = 1usize;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}.{}.{}", stem, n, ext),
            None => format!("{}.{}", stem, n),
        };
        let candidate = target.with_file_name(name);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
