//! X.509 certificate summaries for the signing chain.
//!
//! Each certificate found in the CMS blob is decoded with `x509-certificate`
//! and reduced to the handful of fields a report shows: subject, issuer,
//! validity interval and subject key identifier. The common name is kept
//! separately, since it is what `codesign` prints as a signing authority.
//!
//! # Examples
//!
//! ```no_run
//! use ipa_inspect::crypto::cert::summarize;
//!
//! let der = std::fs::read("developer.cer")?;
//! let decoded = summarize(&der)?;
//! println!("{:?}", decoded.summary.subject);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::report::CertificateSummary;
use crate::{Error, Result};
use bcder::{ConstOid, Mode, OctetString, Oid};
use chrono::{DateTime, SecondsFormat, Utc};
use x509_certificate::X509Certificate;

/// id-ce-subjectKeyIdentifier: 2.5.29.14
const SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[0x55, 0x1d, 0x0e]);

/// A decoded certificate: the report fields plus its common name.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCertificate {
    pub summary: CertificateSummary,
    pub common_name: Option<String>,
    /// Organizational unit of the subject, the Apple team ID on developer certificates
    pub team_id: Option<String>,
    pub certificate: X509Certificate,
}

impl DecodedCertificate {
    /// Whether this certificate's subject issued `other`.
    pub fn issued(&self, other: &DecodedCertificate) -> bool {
        self.certificate.subject_name() == other.certificate.issuer_name()
    }
}

/// Index of the signing (leaf) certificate in `chain`.
///
/// The leaf is the certificate that issued none of the others, whatever
/// order the CMS blob stores them in. Self-signed certificates do not count
/// as issuing themselves.
pub fn leaf_index(chain: &[DecodedCertificate]) -> Option<usize> {
    (0..chain.len()).find(|&i| {
        !chain
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && chain[i].issued(other))
    })
}

/// Decode one DER certificate into its summary.
///
/// # Errors
///
/// Returns [`Error::SignatureParse`] if the bytes are not a decodable
/// X.509 certificate.
pub fn summarize(der: &[u8]) -> Result<DecodedCertificate> {
    let cert = X509Certificate::from_der(der)
        .map_err(|e| Error::SignatureParse(format!("Failed to parse certificate DER: {}", e)))?;

    let summary = CertificateSummary {
        subject: cert.subject_name().user_friendly_str().ok(),
        issuer: cert.issuer_name().user_friendly_str().ok(),
        valid_from: Some(rfc3339(cert.validity_not_before())),
        valid_to: Some(rfc3339(cert.validity_not_after())),
        subject_key_identifier: subject_key_identifier(&cert),
    };

    Ok(DecodedCertificate {
        summary,
        common_name: cert.subject_common_name(),
        team_id: extract_team_id(&cert),
        certificate: cert,
    })
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Extracts the Apple Team ID from a certificate's Organizational Unit field.
fn extract_team_id(cert: &X509Certificate) -> Option<String> {
    let subject = cert.subject_name();

    for atav in subject.iter_organizational_unit() {
        if let Ok(value) = atav.to_string() {
            return Some(value);
        }
    }
    None
}

/// Subject key identifier as upper-case colon-separated hex.
///
/// The extension value wraps a `KeyIdentifier` OCTET STRING. A certificate
/// without the extension, or with one that does not decode, yields `None`.
pub fn subject_key_identifier(cert: &X509Certificate) -> Option<String> {
    let extension = cert
        .iter_extensions()
        .find(|ext| ext.id == SUBJECT_KEY_IDENTIFIER)?;
    let key_id = Mode::Der
        .decode(extension.value.to_bytes(), |cons| OctetString::take_from(cons))
        .ok()?;
    Some(colon_hex(&key_id.to_bytes()))
}

fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAF: &[u8] = include_bytes!("../../tests/fixtures/leaf.der");
    const ROOT: &[u8] = include_bytes!("../../tests/fixtures/root.der");

    #[test]
    fn test_summarize_leaf() {
        let decoded = summarize(LEAF).unwrap();
        let summary = &decoded.summary;

        assert_eq!(
            decoded.common_name.as_deref(),
            Some("Apple Development: Jane Doe (ABCDE12345)")
        );
        assert!(summary.subject.as_deref().unwrap().contains("Jane Doe"));
        assert!(summary.issuer.as_deref().unwrap().contains("Example Root CA"));
        assert_eq!(summary.valid_from.as_deref(), Some("2026-10-18T13:35:42Z"));
        assert_eq!(summary.valid_to.as_deref(), Some("2036-10-15T13:35:42Z"));
        assert_eq!(
            summary.subject_key_identifier.as_deref(),
            Some("30:0D:78:A7:58:A2:A2:3D:FE:B8:AA:80:F5:18:58:AA:10:C1:49:E7")
        );
    }

    #[test]
    fn test_extract_team_id_from_organizational_unit() {
        assert_eq!(summarize(LEAF).unwrap().team_id.as_deref(), Some("TEAMID1234"));
        assert_eq!(summarize(ROOT).unwrap().team_id, None);
    }

    #[test]
    fn test_root_key_identifier() {
        assert_eq!(
            summarize(ROOT).unwrap().summary.subject_key_identifier.as_deref(),
            Some("F2:E7:A8:5B:2C:00:EF:68:6B:63:8A:9F:B1:2F:1E:5D:7D:36:34:4D")
        );
    }

    #[test]
    fn test_leaf_index_ignores_storage_order() {
        let leaf = summarize(LEAF).unwrap();
        let root = summarize(ROOT).unwrap();

        assert!(root.issued(&leaf));
        assert!(!leaf.issued(&root));
        assert_eq!(leaf_index(&[leaf.clone(), root.clone()]), Some(0));
        assert_eq!(leaf_index(&[root.clone(), leaf]), Some(1));
        assert_eq!(leaf_index(&[root]), Some(0));
        assert_eq!(leaf_index(&[]), None);
    }

    #[test]
    fn test_summarize_invalid() {
        assert!(summarize(b"not a certificate").is_err());
        assert!(summarize(&LEAF[..LEAF.len() / 2]).is_err());
    }

    #[test]
    fn test_colon_hex() {
        assert_eq!(colon_hex(&[0x0a, 0xff, 0x00]), "0A:FF:00");
    }
}
