//! App bundle discovery inside an extracted IPA.
//!
//! This module provides functionality to:
//! - Locate the single `.app` bundle under `Payload/`
//! - Find the bundle's main executable
//! - Read bundle-level metadata (size, nested frameworks and plugins, `Info.plist`)
//!
//! # Examples
//!
//! ```no_run
//! use ipa_inspect::bundle::{find_executable, locate_bundle, read_metadata};
//! use std::path::Path;
//!
//! let bundle = locate_bundle(Path::new("/tmp/extracted"))?;
//! let executable = find_executable(&bundle)?;
//! let metadata = read_metadata(&bundle.path)?;
//! println!("{} ({} bytes) -> {:?}", bundle.name, metadata.file_size, executable);
//! # Ok::<(), ipa_inspect::Error>(())
//! ```

pub mod executable;
pub mod metadata;

pub use executable::find_executable;
pub use metadata::{read_metadata, BundleMetadata};

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of application bundle directories
pub const APP_EXTENSION: &str = "app";

/// A located application bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationBundle {
    /// Directory name without the `.app` extension
    pub name: String,
    /// Absolute path of the bundle directory
    pub path: PathBuf,
}

/// Find the one `.app` bundle inside `root/Payload/`.
///
/// # Errors
///
/// - [`Error::InvalidPackageStructure`] if `Payload/` is missing or holds
///   more than one bundle.
/// - [`Error::NoBundleFound`] if `Payload/` holds no bundle.
pub fn locate_bundle(root: &Path) -> Result<ApplicationBundle> {
    let payload_dir = root.join("Payload");

    if !payload_dir.is_dir() {
        return Err(Error::InvalidPackageStructure(
            "No Payload directory found in IPA".into(),
        ));
    }

    let mut bundles = Vec::new();
    for entry in fs::read_dir(&payload_dir).map_err(|e| Error::io_at(&payload_dir, e))? {
        let entry = entry.map_err(|e| Error::io_at(&payload_dir, e))?;
        let path = entry.path();

        // file_type() does not follow symlinks, so a linked "bundle" is ignored
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && is_app_bundle(&path) {
            bundles.push(path);
        }
    }
    bundles.sort();

    match bundles.len() {
        0 => Err(Error::NoBundleFound),
        1 => {
            let path = bundles.remove(0);
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(ApplicationBundle { name, path })
        }
        _ => {
            let names: Vec<String> = bundles
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(Error::InvalidPackageStructure(format!(
                "multiple application bundles: {}",
                names.join(", ")
            )))
        }
    }
}

fn is_app_bundle(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(APP_EXTENSION)
}
