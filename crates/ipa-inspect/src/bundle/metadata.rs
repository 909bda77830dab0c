//! Bundle-level metadata: size, nested bundles and `Info.plist` presence.

use crate::report::BundleDescriptor;
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Extension of embedded framework directories
pub const FRAMEWORK_EXTENSION: &str = "framework";

/// Extension of app extension (plugin) directories
pub const PLUGIN_EXTENSION: &str = "appex";

/// Bundle descriptor file name
pub const INFO_PLIST: &str = "Info.plist";

/// Facts gathered from walking a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleMetadata {
    /// Sum of regular file sizes, symlinks excluded
    pub file_size: u64,
    /// `.framework` directories anywhere in the bundle
    pub embedded_frameworks: usize,
    /// `.appex` directories anywhere in the bundle
    pub plugins: usize,
    pub descriptor: BundleDescriptor,
}

/// Walk `bundle_path` without following symlinks.
pub fn read_metadata(bundle_path: &Path) -> Result<BundleMetadata> {
    let mut metadata = BundleMetadata::default();

    for entry in WalkDir::new(bundle_path).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(bundle_path).to_path_buf();
            match e.into_io_error() {
                Some(io) => Error::io_at(&path, io),
                None => Error::InvalidPackageStructure(format!(
                    "filesystem loop at {}",
                    path.display()
                )),
            }
        })?;

        let file_type = entry.file_type();
        if file_type.is_file() {
            let len = entry
                .metadata()
                .map_err(|e| Error::io_at(entry.path(), e.into()))?
                .len();
            metadata.file_size += len;
        } else if file_type.is_dir() {
            match entry.path().extension().and_then(|e| e.to_str()) {
                Some(FRAMEWORK_EXTENSION) => metadata.embedded_frameworks += 1,
                Some(PLUGIN_EXTENSION) => metadata.plugins += 1,
                _ => {}
            }
        }
    }

    let info_plist = bundle_path.join(INFO_PLIST);
    metadata.descriptor = match fs::symlink_metadata(&info_plist) {
        Ok(m) if m.is_file() => BundleDescriptor {
            present: true,
            raw_size: Some(m.len()),
        },
        _ => BundleDescriptor::default(),
    };

    Ok(metadata)
}
