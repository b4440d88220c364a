//! Shared helpers for integration tests
#![allow(dead_code)]

pub mod http_server;

use std::path::{Path, PathBuf};

pub use http_server::{Request, Response, TestServer};

/// Write an address list file into `dir` and return its path
pub fn write_address_list(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("addresses.txt");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}
