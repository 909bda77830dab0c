//! The analysis record handed to collaborators.
//!
//! Every type here is immutable once built, `Serialize` for JSON output, and
//! compares structurally so repeated analyses of the same package can be
//! checked for equality.

use crate::codesign::CodeDirectorySummary;
use serde::Serialize;

/// Result of analyzing one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Bundle directory name without the `.app` extension
    pub bundle_name: String,
    pub is_signed: bool,
    pub signature: SignatureRecord,
    /// Architecture names in header order, empty when undetermined
    pub architectures: Vec<String>,
    /// Sum of regular file sizes in the bundle, in bytes
    pub file_size: u64,
    pub embedded_frameworks: usize,
    pub plugins: usize,
    pub descriptor: BundleDescriptor,
    /// Main executable path relative to the bundle root
    pub executable: Option<String>,
    /// First diagnostic, if any
    pub error: Option<String>,
    /// Notes about detail that could not be determined
    pub diagnostics: Vec<String>,
}

/// Presence and size of the bundle's `Info.plist`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDescriptor {
    pub present: bool,
    pub raw_size: Option<u64>,
}

/// What the embedded code signature says.
///
/// All signing detail is absent when `is_signed` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub is_signed: bool,
    pub signer_identity: Option<SignerIdentity>,
    pub certificates: Vec<CertificateSummary>,
    pub entitlements: Option<Entitlements>,
}

impl SignatureRecord {
    /// The record for a binary without an embedded signature.
    pub fn unsigned() -> Self {
        Self {
            is_signed: false,
            signer_identity: None,
            certificates: Vec::new(),
            entitlements: None,
        }
    }
}

/// Identity fields of a signed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerIdentity {
    pub bundle_identifier: String,
    pub team_identifier: Option<String>,
    /// e.g. `Mach-O thin (arm64)` or `Mach-O universal (armv7 arm64)`
    pub format: String,
    /// Certificate common names in the order the CMS blob stores them
    pub authorities: Vec<String>,
    /// Size of the signature region in bytes
    pub signature_size: u32,
    pub adhoc: bool,
    pub code_directory: CodeDirectorySummary,
}

/// Report fields of one X.509 certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    /// RFC 3339
    pub valid_from: Option<String>,
    /// RFC 3339
    pub valid_to: Option<String>,
    /// Upper-case colon-separated hex
    pub subject_key_identifier: Option<String>,
}

impl CertificateSummary {
    /// No field was recognized.
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.issuer.is_none()
            && self.valid_from.is_none()
            && self.valid_to.is_none()
            && self.subject_key_identifier.is_none()
    }
}

/// The entitlements plist, verbatim and decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entitlements {
    /// Document text exactly as embedded
    pub raw: String,
    #[serde(skip)]
    pub document: plist::Value,
}

impl Entitlements {
    /// Decode an XML or binary entitlements plist.
    pub fn parse(bytes: &[u8]) -> Result<Self, plist::Error> {
        let document = plist::Value::from_reader(std::io::Cursor::new(bytes))?;
        Ok(Self {
            raw: String::from_utf8_lossy(bytes).into_owned(),
            document,
        })
    }

    /// Top-level entitlement keys, in document order.
    pub fn keys(&self) -> Vec<&str> {
        self.document
            .as_dictionary()
            .map(|dict| dict.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
