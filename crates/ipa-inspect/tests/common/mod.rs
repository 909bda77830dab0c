//! Shared helpers for the integration tests.

#![allow(dead_code)]

#[path = "../../src/testutil.rs"]
mod builders;

pub use builders::*;

use std::fs;
use std::path::Path;

pub const LEAF: &[u8] = include_bytes!("../fixtures/leaf.der");
pub const ROOT: &[u8] = include_bytes!("../fixtures/root.der");

/// Number of entries directly under `dir`.
pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}
