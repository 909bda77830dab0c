//! Certificate extraction from the CMS blob in the signature slot
//!
//! The signature slot holds a detached CMS `ContentInfo` wrapping
//! `SignedData`. Only the `certificates [0]` field is read here; nothing is
//! verified.
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType  OID 1.2.840.113549.1.7.2,
//!     content [0] SignedData ::= SEQUENCE {
//!         version, digestAlgorithms SET, encapContentInfo SEQUENCE,
//!         certificates [0] IMPLICIT SET OF Certificate OPTIONAL,
//!         crls [1] OPTIONAL,
//!         signerInfos SET }
//! }
//! ```
//!
//! The blob is decoded in BER mode since `codesign` and OpenSSL both emit
//! indefinite lengths. Certificates are captured one at a time so a damaged
//! entry only loses itself and whatever follows it, never the ones before it.

use crate::{Error, Result};
use bcder::decode::{Constructed, Content, DecodeError, Source};
use bcder::{Captured, ConstOid, Integer, Mode, Oid, Tag};
use tracing::debug;

/// signedData: 1.2.840.113549.1.7.2
pub const SIGNED_DATA_OID: ConstOid = Oid(&[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02]);

const TAG_SEQUENCE_BYTE: u8 = 0x30;

/// Raw certificate encodings found in a SignedData blob.
#[derive(Clone, Default)]
pub struct CertificateBlobs {
    /// Encoded certificates in stored order
    pub entries: Vec<Captured>,
    /// Entries that were not certificates or could not be framed
    pub malformed: usize,
}

impl std::fmt::Debug for CertificateBlobs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBlobs")
            .field("entries", &self.entries.len())
            .field("malformed", &self.malformed)
            .finish()
    }
}

/// How far the decoder got before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Envelope,
    Certificates,
    Trailer,
}

struct Walk {
    blobs: CertificateBlobs,
    stage: Stage,
}

/// Collect the certificates embedded in a CMS `ContentInfo`.
///
/// # Errors
///
/// Returns [`Error::SignatureParse`] if the outer structure is not a
/// SignedData `ContentInfo`. Problems inside the certificate set are counted
/// in [`CertificateBlobs::malformed`] instead.
pub fn embedded_certificates(cms: &[u8]) -> Result<CertificateBlobs> {
    let mut walk = Walk {
        blobs: CertificateBlobs::default(),
        stage: Stage::Envelope,
    };

    let outcome = Mode::Ber.decode(cms, |cons| {
        cons.take_sequence(|cons| {
            let content_type = Oid::take_from(cons)?;
            if content_type != SIGNED_DATA_OID {
                return Err(cons.content_err("content type is not signedData"));
            }
            cons.take_constructed_if(Tag::CTX_0, |cons| {
                cons.take_sequence(|cons| take_signed_data(cons, &mut walk))
            })
        })
    });

    match outcome {
        Ok(()) => Ok(walk.blobs),
        Err(e) => match walk.stage {
            Stage::Envelope => Err(Error::SignatureParse(format!("CMS: {}", e))),
            Stage::Certificates => {
                debug!("certificate entry unreadable: {}", e);
                walk.blobs.malformed += 1;
                Ok(walk.blobs)
            }
            Stage::Trailer => {
                debug!("ignoring unreadable SignedData trailer: {}", e);
                Ok(walk.blobs)
            }
        },
    }
}

fn take_signed_data<S: Source>(
    cons: &mut Constructed<S>,
    walk: &mut Walk,
) -> std::result::Result<(), DecodeError<S::Error>> {
    Integer::take_from(cons)?;
    cons.take_set(skip_remaining)?;
    cons.take_sequence(skip_remaining)?;

    walk.stage = Stage::Certificates;
    cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
        loop {
            let mut found = false;
            let captured = cons.capture(|cons| {
                found = cons.take_opt_value(|_, content| skip_content(content))?.is_some();
                Ok(())
            })?;
            if !found {
                break;
            }
            if captured.as_slice().first() == Some(&TAG_SEQUENCE_BYTE) {
                walk.blobs.entries.push(captured);
            } else {
                debug!("skipping non-certificate choice");
                walk.blobs.malformed += 1;
            }
        }
        Ok(())
    })?;

    // crls and signerInfos
    walk.stage = Stage::Trailer;
    skip_remaining(cons)
}

/// Skip every value left in `cons`, definite or indefinite.
fn skip_remaining<S: Source>(
    cons: &mut Constructed<S>,
) -> std::result::Result<(), DecodeError<S::Error>> {
    while cons.take_opt_value(|_, content| skip_content(content))?.is_some() {}
    Ok(())
}

fn skip_content<S: Source>(
    content: &mut Content<S>,
) -> std::result::Result<(), DecodeError<S::Error>> {
    match content {
        Content::Primitive(prim) => prim.skip_all(),
        Content::Constructed(cons) => skip_remaining(cons),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_cms, der};

    const LEAF: &[u8] = include_bytes!("../../tests/fixtures/leaf.der");
    const ROOT: &[u8] = include_bytes!("../../tests/fixtures/root.der");
    const OPENSSL_CMS: &[u8] = include_bytes!("../../tests/fixtures/signature.cms");

    const SIGNED_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

    fn entries(blobs: &CertificateBlobs) -> Vec<&[u8]> {
        blobs.entries.iter().map(|c| c.as_slice()).collect()
    }

    #[test]
    fn test_indefinite_length_cms_from_openssl() {
        let blobs = embedded_certificates(OPENSSL_CMS).unwrap();
        assert_eq!(blobs.malformed, 0);
        assert_eq!(entries(&blobs), vec![ROOT, LEAF]);
    }

    #[test]
    fn test_definite_length_cms() {
        let cms = build_cms(&[LEAF, ROOT]);
        let blobs = embedded_certificates(&cms).unwrap();
        assert_eq!(entries(&blobs), vec![LEAF, ROOT]);
    }

    #[test]
    fn test_truncated_certificate_keeps_earlier_ones() {
        let cms = build_cms(&[LEAF, &ROOT[..100]]);
        let blobs = embedded_certificates(&cms).unwrap();
        assert_eq!(entries(&blobs), vec![LEAF]);
        assert_eq!(blobs.malformed, 1);
    }

    #[test]
    fn test_other_certificate_choice_is_skipped() {
        let attribute_cert = der(0xa2, &[0x05, 0x00]);
        let cms = build_cms(&[&attribute_cert, LEAF]);
        let blobs = embedded_certificates(&cms).unwrap();
        assert_eq!(entries(&blobs), vec![LEAF]);
        assert_eq!(blobs.malformed, 1);
    }

    #[test]
    fn test_no_certificate_set() {
        let mut signed_data = der(0x02, &[1]);
        signed_data.extend(der(0x31, &[]));
        signed_data.extend(der(0x30, &der(0x06, &[0x2a])));
        signed_data.extend(der(0x31, &[]));
        let mut content_info = der(0x06, SIGNED_DATA);
        content_info.extend(der(0xa0, &der(0x30, &signed_data)));
        let cms = der(0x30, &content_info);

        let blobs = embedded_certificates(&cms).unwrap();
        assert!(blobs.entries.is_empty());
        assert_eq!(blobs.malformed, 0);
    }

    #[test]
    fn test_wrong_content_type() {
        let mut content_info = der(0x06, &[0x2a, 0x86, 0x48]);
        content_info.extend(der(0xa0, &der(0x30, &[])));
        let cms = der(0x30, &content_info);
        assert!(matches!(
            embedded_certificates(&cms),
            Err(Error::SignatureParse(_))
        ));
    }

    #[test]
    fn test_garbage() {
        assert!(embedded_certificates(b"not asn1 at all").is_err());
        assert!(embedded_certificates(&[]).is_err());
    }
}
