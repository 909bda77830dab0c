//! Code signing structures and constants for iOS/macOS binaries

pub mod code_directory;
pub mod constants;
pub mod inspect;
pub mod superblob;

pub use code_directory::{CodeDirectory, CodeDirectorySummary};
pub use inspect::{inspect_signature, inspect_signature_bytes, SignatureInspection};
pub use superblob::SuperBlob;

/// Big-endian u32 at `offset`, `None` when out of range.
pub(crate) fn read_be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
