//! Error types for package analysis.
//!
//! This module defines the [`enum@Error`] enum covering every failure an
//! analysis run can report: archive corruption, unsafe archive entries,
//! resource limits, package structure problems, binary format problems and
//! file-system failures.
//!
//! Not every variant aborts an analysis. Failures that only concern the
//! executable's signing detail ([`Error::UnrecognizedBinaryFormat`],
//! [`Error::SignatureParse`]) are caught by the [`crate::Analyzer`] and turned
//! into diagnostics on the returned [`crate::AnalysisResult`].
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::io;
use std::path::Path;
use thiserror::Error;

/// Error type for package analysis.
///
/// # Examples
///
/// ```no_run
/// use ipa_inspect::{Analyzer, Error};
///
/// match Analyzer::new().analyze_path("App.ipa") {
///     Ok(result) => println!("{} signed: {}", result.bundle_name, result.is_signed),
///     Err(Error::NoBundleFound) => eprintln!("package has no .app bundle"),
///     Err(Error::UnsafeEntryPath(name)) => eprintln!("refusing entry {name}"),
///     Err(e) => eprintln!("analysis failed: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Occurs when reading the package, writing into the scratch workspace,
    /// or walking the extracted bundle.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a readable ZIP container.
    ///
    /// Bad magic, a truncated central directory or entry stream, or an
    /// unsupported compression method.
    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    /// An archive entry would be written outside the extraction root.
    #[error("Unsafe archive entry path: {0}")]
    UnsafeEntryPath(String),

    /// The archive exceeds the configured entry count or uncompressed size.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// The extracted payload does not have the layout of an application package.
    #[error("Invalid package structure: {0}")]
    InvalidPackageStructure(String),

    /// `Payload/` exists but holds no `.app` directory.
    #[error("No .app bundle found in Payload/")]
    NoBundleFound,

    /// The executable does not start with a known Mach-O or fat magic.
    #[error("Unrecognized binary format: {0}")]
    UnrecognizedBinaryFormat(String),

    /// The embedded code signature is present but malformed.
    #[error("Malformed code signature: {0}")]
    SignatureParse(String),

    /// Invalid analyzer configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wraps an I/O error with the path it concerns.
    pub(crate) fn io_at(path: &Path, err: io::Error) -> Self {
        Error::Io(io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }

    /// Whether this error only degrades the signing detail of a result.
    ///
    /// The aggregator keeps going after these and records them as diagnostics.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnrecognizedBinaryFormat(_) | Error::SignatureParse(_)
        )
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => match e.kind() {
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                    Error::ArchiveFormat(e.to_string())
                }
                _ => Error::Io(e),
            },
            other => Error::ArchiveFormat(other.to_string()),
        }
    }
}
