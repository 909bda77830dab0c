//! Scratch workspace for one analysis run.
//!
//! Each run extracts into its own directory created by `tempfile` with a
//! random suffix, so concurrent runs sharing a parent never collide. The
//! directory is removed by [`Workspace::close`] or, failing that, on drop.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every scratch directory name.
pub const WORKSPACE_PREFIX: &str = "ipa-inspect-";

/// A uniquely named directory owned by exactly one analysis run.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a workspace inside `parent`, creating `parent` if needed.
    pub fn create_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| Error::io_at(parent, e))?;
        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "created scratch workspace");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    /// Create a workspace in the system temp directory.
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace recursively, reporting failure.
    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                dir.close()?;
                debug!(workspace = %self.path.display(), "removed scratch workspace");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(workspace = %self.path.display(), "failed to remove scratch workspace: {}", e);
            }
        }
    }
}
