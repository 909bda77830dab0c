//! Main executable lookup.

use super::ApplicationBundle;
use crate::{Error, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Find the bundle's main executable among its top-level entries.
///
/// A regular file named exactly like the bundle wins. Otherwise the first
/// regular file (by name) with any execute bit set is taken. `Ok(None)` when
/// neither exists; that is a valid outcome, not an error.
pub fn find_executable(bundle: &ApplicationBundle) -> Result<Option<PathBuf>> {
    let named = bundle.path.join(&bundle.name);
    if fs::symlink_metadata(&named)
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Ok(Some(named));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(&bundle.path).map_err(|e| Error::io_at(&bundle.path, e))? {
        let entry = entry.map_err(|e| Error::io_at(&bundle.path, e))?;
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        if is_executable(&metadata) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let found = candidates.into_iter().next();
    debug!(bundle = %bundle.name, executable = ?found, "fell back to execute-bit search");
    Ok(found)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}
