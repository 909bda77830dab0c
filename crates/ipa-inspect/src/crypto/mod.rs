//! Read-only access to the CMS signature and the certificates it carries

pub mod cert;
pub mod cms;

pub use cert::{leaf_index, summarize, DecodedCertificate};
pub use cms::{embedded_certificates, CertificateBlobs};
