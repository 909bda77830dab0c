//! IPA extraction functionality.
//!
//! Extracts IPA archives into a scratch directory. Every entry is vetted
//! before anything touches the disk: its path must stay inside the
//! destination, symlink targets must too, and the entry count and declared
//! uncompressed size must fit the configured [`ExtractLimits`].

use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// Default bound on the total declared uncompressed size: 4 GiB.
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Default bound on the number of archive entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Longest symlink target accepted from an archive.
const MAX_SYMLINK_TARGET: u64 = 4096;

/// Decompression-bomb bounds applied before extraction starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Maximum sum of declared uncompressed entry sizes, in bytes
    pub max_total_size: u64,
    /// Maximum number of entries in the archive
    pub max_entries: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Counts reported after a successful extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    /// Sum of declared uncompressed sizes
    pub total_size: u64,
}

#[derive(Debug)]
enum EntryKind {
    Directory,
    File,
    Symlink(String),
}

/// Entry metadata collected in the validation pass
#[derive(Debug)]
struct ExtractEntry {
    index: usize,
    outpath: PathBuf,
    size: u64,
    kind: EntryKind,
    unix_mode: Option<u32>,
}

/// Extract the IPA at `ipa_path` into `dest_dir`.
///
/// The file is memory-mapped and handed to [`extract_archive`].
pub fn extract_ipa(
    ipa_path: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
    limits: &ExtractLimits,
    parallel: bool,
) -> Result<ExtractSummary> {
    let ipa_path = ipa_path.as_ref();

    let file = File::open(ipa_path).map_err(|e| Error::io_at(ipa_path, e))?;
    if file.metadata().map_err(|e| Error::io_at(ipa_path, e))?.len() == 0 {
        return Err(Error::ArchiveFormat("empty file".into()));
    }
    // SAFETY: the mapping is read-only and dropped before returning.
    let mmap = unsafe { Mmap::map(&file).map_err(|e| Error::io_at(ipa_path, e))? };

    extract_archive(&mmap, dest_dir.as_ref(), limits, parallel)
}

/// Extract ZIP bytes into `dest_dir`.
///
/// # Errors
///
/// - [`Error::ArchiveFormat`] if `data` is not a readable ZIP archive.
/// - [`Error::UnsafeEntryPath`] if an entry path or symlink target would
///   land outside `dest_dir`; nothing is written in that case.
/// - [`Error::ResourceLimitExceeded`] if `limits` are exceeded; nothing is
///   written in that case either, except when an entry inflates past its
///   declared size, which is caught while copying.
/// - [`Error::Io`] for file-system failures.
pub fn extract_archive(
    data: &[u8],
    dest_dir: &Path,
    limits: &ExtractLimits,
    parallel: bool,
) -> Result<ExtractSummary> {
    // ZIP magic: PK\x03\x04 or PK\x05\x06 (empty)
    if !data.starts_with(b"PK") {
        return Err(Error::ArchiveFormat("Not a valid ZIP/IPA file".into()));
    }

    let mut archive = ZipArchive::new(Cursor::new(data))?;
    if archive.len() > limits.max_entries {
        return Err(Error::ResourceLimitExceeded(format!(
            "archive has {} entries, limit is {}",
            archive.len(),
            limits.max_entries
        )));
    }

    let entries = collect_entries(&mut archive, dest_dir, limits)?;
    let mut summary = ExtractSummary {
        total_size: entries.iter().map(|e| e.size).sum(),
        ..Default::default()
    };

    // Create all directories first (sequential, fast)
    let mut dirs_to_create: BTreeSet<&Path> = BTreeSet::new();
    dirs_to_create.insert(dest_dir);
    for entry in &entries {
        match entry.kind {
            EntryKind::Directory => {
                dirs_to_create.insert(&entry.outpath);
            }
            _ => {
                if let Some(parent) = entry.outpath.parent() {
                    dirs_to_create.insert(parent);
                }
            }
        }
    }
    for dir in &dirs_to_create {
        fs::create_dir_all(dir).map_err(|e| Error::io_at(dir, e))?;
    }
    summary.directories = entries
        .iter()
        .filter(|e| matches!(e.kind, EntryKind::Directory))
        .count();

    let files: Vec<&ExtractEntry> = entries
        .iter()
        .filter(|e| matches!(e.kind, EntryKind::File))
        .collect();
    summary.files = files.len();

    if parallel {
        files
            .par_iter()
            .try_for_each_init(|| archive.clone(), |archive, entry| write_file(archive, entry))?;
    } else {
        files
            .iter()
            .try_for_each(|entry| write_file(&mut archive, entry))?;
    }

    // Symlinks last, so no file is ever written through one.
    for entry in &entries {
        if let EntryKind::Symlink(target) = &entry.kind {
            create_symlink(target, &entry.outpath)?;
            summary.symlinks += 1;
        }
    }

    debug!(
        files = summary.files,
        directories = summary.directories,
        symlinks = summary.symlinks,
        bytes = summary.total_size,
        "extracted archive"
    );
    Ok(summary)
}

/// Validation pass: nothing is written until every entry has been accepted.
fn collect_entries(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    dest_dir: &Path,
    limits: &ExtractLimits,
) -> Result<Vec<ExtractEntry>> {
    let mut entries = Vec::with_capacity(archive.len());
    let mut total_size: u64 = 0;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;

        let relative = file
            .enclosed_name()
            .ok_or_else(|| Error::UnsafeEntryPath(file.name().to_string()))?;

        total_size = total_size.saturating_add(file.size());
        if total_size > limits.max_total_size {
            return Err(Error::ResourceLimitExceeded(format!(
                "uncompressed size exceeds {} bytes at entry {}",
                limits.max_total_size,
                file.name()
            )));
        }

        let unix_mode = file.unix_mode();
        let is_symlink = unix_mode
            .map(|mode| (mode & 0o170000) == 0o120000)
            .unwrap_or(false);

        let kind = if file.is_dir() {
            EntryKind::Directory
        } else if is_symlink {
            let mut target = String::new();
            (&mut file)
                .take(MAX_SYMLINK_TARGET)
                .read_to_string(&mut target)?;
            if symlink_escapes(&relative, &target) {
                return Err(Error::UnsafeEntryPath(format!(
                    "{} -> {}",
                    file.name(),
                    target
                )));
            }
            EntryKind::Symlink(target)
        } else {
            EntryKind::File
        };

        entries.push(ExtractEntry {
            index,
            outpath: dest_dir.join(relative),
            size: file.size(),
            kind,
            unix_mode,
        });
    }

    Ok(entries)
}

/// Whether a link at `link` (relative to the root) pointing at `target`
/// resolves outside the root. Purely lexical.
fn symlink_escapes(link: &Path, target: &str) -> bool {
    let target = Path::new(target);
    let parent = link.parent().unwrap_or_else(|| Path::new(""));

    let mut depth: usize = 0;
    for component in parent.components().chain(target.components()) {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

fn write_file(archive: &mut ZipArchive<Cursor<&[u8]>>, entry: &ExtractEntry) -> Result<()> {
    let file = archive.by_index(entry.index)?;

    let mut outfile = File::create(&entry.outpath).map_err(|e| Error::io_at(&entry.outpath, e))?;
    // One byte past the declared size is enough to catch an entry that lies.
    let written = io::copy(&mut file.take(entry.size + 1), &mut outfile)
        .map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                Error::ArchiveFormat(format!("{}: {}", entry.outpath.display(), e))
            }
            _ => Error::io_at(&entry.outpath, e),
        })?;
    if written > entry.size {
        return Err(Error::ResourceLimitExceeded(format!(
            "{} inflates past its declared {} bytes",
            entry.outpath.display(),
            entry.size
        )));
    }

    // Set file permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = entry.unix_mode {
            let perms = mode & 0o7777;
            fs::set_permissions(&entry.outpath, fs::Permissions::from_mode(perms))
                .map_err(|e| Error::io_at(&entry.outpath, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = entry.unix_mode;

    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| Error::io_at(link, e))
}

#[cfg(not(unix))]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    debug!("skipping symlink {} -> {}", link.display(), target);
    Ok(())
}
