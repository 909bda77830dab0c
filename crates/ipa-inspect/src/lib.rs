//! Read-only inspector for iOS application packages.
//!
//! Given an `.ipa`, [`Analyzer`] extracts it into a private scratch
//! directory, finds the application bundle and its main executable, and
//! reports supported architectures, code-signature presence, signer
//! identity, the embedded certificate chain and entitlements. Nothing is
//! verified against a trust root and the package is never modified.

pub mod analyzer;
pub mod bundle;
pub mod codesign;
pub mod crypto;
pub mod error;
pub mod ipa;
pub mod macho;
pub mod report;

#[cfg(test)]
mod testutil;

pub use analyzer::Analyzer;
pub use error::Error;
pub use ipa::ExtractLimits;
pub use report::{
    AnalysisResult, BundleDescriptor, CertificateSummary, Entitlements, SignatureRecord,
    SignerIdentity,
};

pub type Result<T> = std::result::Result<T, Error>;
