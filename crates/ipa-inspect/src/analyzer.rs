//! Analyzer builder API
//!
//! Provides a builder pattern interface for analyzing IPA packages: extract
//! into a private scratch workspace, locate the bundle and its executable,
//! inspect architectures and the code signature, read bundle metadata, and
//! remove the workspace again on every path.

use crate::bundle::{find_executable, locate_bundle, read_metadata};
use crate::codesign::inspect_signature;
use crate::ipa::{extract_archive, extract_ipa, ExtractLimits, ExtractSummary, Workspace};
use crate::macho::inspect_architectures;
use crate::report::{AnalysisResult, SignatureRecord};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// IPA analyzer with builder pattern API.
///
/// Holds no state between calls; one `Analyzer` may serve concurrent
/// analyses of different packages.
///
/// # Example
///
/// ```no_run
/// use ipa_inspect::Analyzer;
///
/// let result = Analyzer::new()
///     .max_total_size(512 * 1024 * 1024)
///     .scratch_dir("/var/tmp/ipa-inspect")
///     .analyze_path("App.ipa")?;
/// println!("{} signed: {}", result.bundle_name, result.is_signed);
/// # Ok::<(), ipa_inspect::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    scratch_dir: Option<PathBuf>,
    limits: ExtractLimits,
    parallel: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Create a new analyzer with default limits.
    pub fn new() -> Self {
        Self {
            scratch_dir: None,
            limits: ExtractLimits::default(),
            parallel: true,
        }
    }

    /// Set the parent directory for scratch workspaces.
    ///
    /// Defaults to the system temp directory.
    pub fn scratch_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.scratch_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the bound on the total declared uncompressed size, in bytes.
    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.limits.max_total_size = bytes;
        self
    }

    /// Set the bound on the number of archive entries.
    pub fn max_entries(mut self, entries: usize) -> Self {
        self.limits.max_entries = entries;
        self
    }

    /// Extract in parallel and inspect architectures and signature
    /// concurrently. Enabled by default.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate the builder configuration.
    ///
    /// Returns an error if either limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_total_size == 0 {
            return Err(Error::Config("max_total_size must be greater than zero".into()));
        }
        if self.limits.max_entries == 0 {
            return Err(Error::Config("max_entries must be greater than zero".into()));
        }
        Ok(())
    }

    /// Analyze the package at `path`.
    ///
    /// # Errors
    ///
    /// Structural failures (unreadable archive, unsafe entry, exceeded limit,
    /// missing or ambiguous bundle) and I/O errors. Problems limited to the
    /// executable's signing detail are reported in
    /// [`AnalysisResult::diagnostics`] instead.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        let path = path.as_ref();
        info!(package = %path.display(), "analyzing package");
        self.run(|root| extract_ipa(path, root, &self.limits, self.parallel))
    }

    /// Analyze a package held in memory.
    pub fn analyze_bytes(&self, data: &[u8]) -> Result<AnalysisResult> {
        info!(bytes = data.len(), "analyzing package");
        self.run(|root| extract_archive(data, root, &self.limits, self.parallel))
    }

    fn run(&self, extract: impl FnOnce(&Path) -> Result<ExtractSummary>) -> Result<AnalysisResult> {
        self.validate()?;

        let workspace = match &self.scratch_dir {
            Some(parent) => Workspace::create_in(parent)?,
            None => Workspace::create()?,
        };

        let outcome = extract(workspace.path()).and_then(|summary| {
            debug!(
                files = summary.files,
                directories = summary.directories,
                symlinks = summary.symlinks,
                bytes = summary.total_size,
                "extracted package"
            );
            self.analyze_extracted(workspace.path())
        });

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!(workspace = %workspace_path.display(), "failed to remove scratch workspace: {}", e);
        }

        match &outcome {
            Ok(result) => info!(
                bundle = %result.bundle_name,
                signed = result.is_signed,
                diagnostics = result.diagnostics.len(),
                "analysis complete"
            ),
            Err(e) => debug!("analysis failed: {}", e),
        }
        outcome
    }

    fn analyze_extracted(&self, root: &Path) -> Result<AnalysisResult> {
        let bundle = locate_bundle(root)?;
        debug!(bundle = %bundle.name, "located application bundle");

        let executable = find_executable(&bundle)?;
        let mut diagnostics = Vec::new();

        let (architectures, signature) = match &executable {
            Some(exe) => {
                let (arch, sig) = if self.parallel {
                    rayon::join(|| inspect_architectures(exe), || inspect_signature(exe))
                } else {
                    (inspect_architectures(exe), inspect_signature(exe))
                };

                let architectures = match arch {
                    Ok(set) => set.into_vec(),
                    Err(e) if e.is_recoverable() => {
                        warn!("architecture detection failed: {}", e);
                        diagnostics.push(e.to_string());
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };

                let signature = match sig {
                    Ok(inspection) => {
                        for note in &inspection.diagnostics {
                            warn!("signature: {}", note);
                        }
                        diagnostics.extend(inspection.diagnostics);
                        inspection.record
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!("signature inspection failed: {}", e);
                        let note = e.to_string();
                        if !diagnostics.contains(&note) {
                            diagnostics.push(note);
                        }
                        SignatureRecord::unsigned()
                    }
                    Err(e) => return Err(e),
                };

                (architectures, signature)
            }
            None => {
                debug!(bundle = %bundle.name, "no main executable found");
                (Vec::new(), SignatureRecord::unsigned())
            }
        };

        let metadata = read_metadata(&bundle.path)?;

        let executable = executable.as_ref().map(|exe| {
            exe.strip_prefix(&bundle.path)
                .unwrap_or(exe)
                .to_string_lossy()
                .into_owned()
        });

        Ok(AnalysisResult {
            bundle_name: bundle.name,
            is_signed: signature.is_signed,
            signature,
            architectures,
            file_size: metadata.file_size,
            embedded_frameworks: metadata.embedded_frameworks,
            plugins: metadata.plugins,
            descriptor: metadata.descriptor,
            executable,
            error: diagnostics.first().cloned(),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codesign::constants::*;
    use crate::testutil::{app_ipa, build_macho, IpaBuilder};
    use tempfile::TempDir;

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(matches!(
            Analyzer::new().max_total_size(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Analyzer::new().max_entries(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(Analyzer::new().validate().is_ok());
    }

    #[test]
    fn test_analyze_unsigned_bytes() {
        let scratch = TempDir::new().unwrap();
        let ipa = app_ipa("Test", &build_macho(CPU_TYPE_ARM64, 0, None));

        let result = Analyzer::new()
            .scratch_dir(scratch.path())
            .analyze_bytes(&ipa)
            .unwrap();

        assert_eq!(result.bundle_name, "Test");
        assert!(!result.is_signed);
        assert_eq!(result.architectures, vec!["arm64"]);
        assert_eq!(result.executable.as_deref(), Some("Test"));
        assert!(result.descriptor.present);
        assert_eq!(result.error, None);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unrecognized_binary_is_a_diagnostic() {
        let scratch = TempDir::new().unwrap();
        let ipa = app_ipa("Test", b"#!/bin/sh\necho hello\n");

        let result = Analyzer::new()
            .scratch_dir(scratch.path())
            .parallel(false)
            .analyze_bytes(&ipa)
            .unwrap();

        assert!(!result.is_signed);
        assert!(result.architectures.is_empty());
        assert!(!result.diagnostics.is_empty());
        assert_eq!(result.error.as_ref(), result.diagnostics.first());
    }

    #[test]
    fn test_bundle_without_executable() {
        let scratch = TempDir::new().unwrap();
        let ipa = IpaBuilder::new()
            .dir("Payload/")
            .dir("Payload/Empty.app/")
            .finish();

        let result = Analyzer::new()
            .scratch_dir(scratch.path())
            .analyze_bytes(&ipa)
            .unwrap();

        assert_eq!(result.bundle_name, "Empty");
        assert_eq!(result.executable, None);
        assert!(!result.is_signed);
        assert!(result.diagnostics.is_empty());
        assert!(!result.descriptor.present);
    }

    #[test]
    fn test_structural_error_cleans_workspace() {
        let scratch = TempDir::new().unwrap();
        let ipa = IpaBuilder::new().file("README", b"no payload").finish();

        let result = Analyzer::new().scratch_dir(scratch.path()).analyze_bytes(&ipa);
        assert!(matches!(result, Err(Error::InvalidPackageStructure(_))));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
