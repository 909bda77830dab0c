//! Signature inspection for a single executable.
//!
//! Reads the embedded signature straight out of the Mach-O: the
//! `LC_CODE_SIGNATURE` region, its SuperBlob, the CodeDirectory, the
//! entitlements slot and the CMS certificate chain.

use super::constants::*;
use super::{CodeDirectory, SuperBlob};
use crate::crypto::{cert, cms};
use crate::macho::{arch_name, MachOFile};
use crate::report::{CertificateSummary, Entitlements, SignatureRecord, SignerIdentity};
use crate::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// A signature record plus the notes about parts that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInspection {
    pub record: SignatureRecord,
    pub diagnostics: Vec<String>,
}

impl SignatureInspection {
    fn unsigned() -> Self {
        Self {
            record: SignatureRecord::unsigned(),
            diagnostics: Vec::new(),
        }
    }
}

/// Inspect the signature of the executable at `path`.
pub fn inspect_signature(path: &Path) -> Result<SignatureInspection> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    if file.metadata().map_err(|e| Error::io_at(path, e))?.len() == 0 {
        return Err(Error::UnrecognizedBinaryFormat("empty file".into()));
    }
    // SAFETY: the executable lives in this run's private workspace and is
    // not modified while mapped.
    let mmap = unsafe { Mmap::map(&file).map_err(|e| Error::io_at(path, e))? };
    inspect_signature_bytes(&mmap)
}

/// Inspect the signature of an in-memory executable.
///
/// A binary without `LC_CODE_SIGNATURE` yields an unsigned record. A bad
/// entitlements blob or undecodable certificates only add diagnostics.
///
/// # Errors
///
/// - [`Error::UnrecognizedBinaryFormat`] if the bytes are not Mach-O.
/// - [`Error::SignatureParse`] if the SuperBlob or CodeDirectory is malformed.
pub fn inspect_signature_bytes(data: &[u8]) -> Result<SignatureInspection> {
    let macho = MachOFile::parse(data)?;

    let slice = match macho.signed_slice() {
        Some(slice) => slice,
        None => {
            debug!("no LC_CODE_SIGNATURE in any slice");
            return Ok(SignatureInspection::unsigned());
        }
    };
    let signature = match macho.signature_bytes(slice)? {
        Some(bytes) => bytes,
        None => return Ok(SignatureInspection::unsigned()),
    };

    let superblob = SuperBlob::parse(signature)?;
    let cd_blob = superblob
        .code_directory()?
        .ok_or_else(|| Error::SignatureParse("SuperBlob has no CodeDirectory".into()))?;
    let code_directory = CodeDirectory::parse(cd_blob.data)?;
    debug!(
        identifier = %code_directory.identifier,
        version = code_directory.version,
        linker_signed = code_directory.is_linker_signed(),
        "parsed CodeDirectory"
    );

    let mut diagnostics = Vec::new();

    let entitlements = match superblob.blob(CSSLOT_ENTITLEMENTS) {
        Ok(Some(blob)) if blob.magic == CSMAGIC_EMBEDDED_ENTITLEMENTS => {
            match Entitlements::parse(blob.payload()) {
                Ok(ent) => Some(ent),
                Err(e) => {
                    diagnostics.push(format!("entitlements could not be decoded: {}", e));
                    None
                }
            }
        }
        Ok(Some(blob)) => {
            diagnostics.push(format!("unexpected entitlements blob magic {:#010x}", blob.magic));
            None
        }
        Ok(None) => None,
        Err(e) => {
            diagnostics.push(e.to_string());
            None
        }
    };

    let cms_payload = match superblob.blob(CSSLOT_SIGNATURESLOT) {
        Ok(blob) => blob.map(|b| b.payload()).filter(|p| !p.is_empty()),
        Err(e) => {
            diagnostics.push(e.to_string());
            None
        }
    };

    let mut chain = Vec::new();
    if let Some(payload) = cms_payload {
        match cms::embedded_certificates(payload) {
            Ok(blobs) => {
                let mut skipped = blobs.malformed;
                for entry in &blobs.entries {
                    match cert::summarize(entry.as_slice()) {
                        Ok(decoded) if !decoded.summary.is_empty() => chain.push(decoded),
                        Ok(_) => {}
                        Err(e) => {
                            debug!("skipping certificate: {}", e);
                            skipped += 1;
                        }
                    }
                }
                if skipped > 0 {
                    diagnostics.push(format!("{} certificate(s) could not be decoded", skipped));
                }
            }
            Err(e) => diagnostics.push(e.to_string()),
        }
    }

    let team_identifier = code_directory.team_id.clone().or_else(|| {
        cert::leaf_index(&chain).and_then(|i| chain[i].team_id.clone())
    });

    let identity = SignerIdentity {
        bundle_identifier: code_directory.identifier.clone(),
        team_identifier,
        format: format_description(&macho),
        authorities: chain.iter().filter_map(|c| c.common_name.clone()).collect(),
        signature_size: slice.code_sig_size.unwrap_or_default(),
        adhoc: code_directory.is_adhoc() || cms_payload.is_none(),
        code_directory: code_directory.summary(),
    };

    let certificates: Vec<CertificateSummary> = chain.into_iter().map(|c| c.summary).collect();

    Ok(SignatureInspection {
        record: SignatureRecord {
            is_signed: true,
            signer_identity: Some(identity),
            certificates,
            entitlements,
        },
        diagnostics,
    })
}

/// `codesign`-style format line, e.g. `Mach-O universal (armv7 arm64)`.
fn format_description(macho: &MachOFile) -> String {
    let names: Vec<String> = macho
        .slices()
        .iter()
        .map(|s| arch_name(s.cpu_type, s.cpu_subtype))
        .collect();
    let kind = if macho.is_fat() { "universal" } else { "thin" };
    format!("Mach-O {} ({})", kind, names.join(" "))
}
