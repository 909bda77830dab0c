//! SuperBlob parsing for Apple code signatures
//!
//! The SuperBlob is the top-level container for all code signature components.
//! It contains a header followed by an index of blob entries, each pointing
//! to embedded blobs (CodeDirectory, requirements, entitlements, CMS signature, etc.)
//!
//! ## Structure
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ SuperBlob Header (12 bytes)        │
//! │  - magic: 0xfade0cc0 (4 bytes)     │
//! │  - length: total size (4 bytes)    │
//! │  - count: number of blobs (4 bytes)│
//! ├────────────────────────────────────┤
//! │ Index Entry 0 (8 bytes)            │
//! │  - slot_type (4 bytes)             │
//! │  - offset (4 bytes)                │
//! ├────────────────────────────────────┤
//! │ ... more index entries             │
//! ├────────────────────────────────────┤
//! │ Blob 0 data                        │
//! ├────────────────────────────────────┤
//! │ ... more blob data                 │
//! └────────────────────────────────────┘
//! ```
//!
//! Every integer is big-endian regardless of the host binary's byte order.
//! Each embedded blob starts with its own `magic` and `length` words.

use super::constants::*;
use super::read_be_u32;
use crate::{Error, Result};

/// Size of the SuperBlob header in bytes (magic + length + count)
const SUPERBLOB_HEADER_SIZE: usize = 12;

/// Size of each index entry in bytes (slot_type + offset)
const INDEX_ENTRY_SIZE: usize = 8;

/// Size of a generic blob header (magic + length)
pub const BLOB_HEADER_SIZE: usize = 8;

/// One entry of the SuperBlob index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobIndex {
    /// The slot type identifying this blob's purpose.
    /// See `CSSLOT_*` constants for standard slot types.
    pub slot_type: u32,
    /// Offset of the blob from the start of the SuperBlob.
    pub offset: u32,
}

/// A blob referenced from the SuperBlob index.
#[derive(Debug, Clone, Copy)]
pub struct Blob<'a> {
    pub slot_type: u32,
    pub magic: u32,
    /// The raw blob data, including its own magic and length header.
    pub data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Blob payload after the 8-byte magic/length header.
    pub fn payload(&self) -> &'a [u8] {
        &self.data[BLOB_HEADER_SIZE..]
    }
}

/// A parsed embedded-signature SuperBlob.
#[derive(Debug, Clone)]
pub struct SuperBlob<'a> {
    data: &'a [u8],
    entries: Vec<BlobIndex>,
}

impl<'a> SuperBlob<'a> {
    /// Parse a SuperBlob from the bytes `LC_CODE_SIGNATURE` points at.
    ///
    /// `data` may be longer than the SuperBlob (the linker pads the
    /// signature region); it must not be shorter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureParse`] on a wrong magic, a declared length
    /// that does not fit, or an index entry pointing outside the SuperBlob.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let magic = read_be_u32(data, 0)
            .ok_or_else(|| Error::SignatureParse("truncated SuperBlob header".into()))?;
        if magic != CSMAGIC_EMBEDDED_SIGNATURE {
            return Err(Error::SignatureParse(format!(
                "bad SuperBlob magic {:#010x}",
                magic
            )));
        }

        let length = read_be_u32(data, 4)
            .ok_or_else(|| Error::SignatureParse("truncated SuperBlob header".into()))?
            as usize;
        let count = read_be_u32(data, 8)
            .ok_or_else(|| Error::SignatureParse("truncated SuperBlob header".into()))?
            as usize;

        if length > data.len() {
            return Err(Error::SignatureParse(format!(
                "SuperBlob length {} exceeds the {} bytes available",
                length,
                data.len()
            )));
        }

        let index_end = count
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|n| n.checked_add(SUPERBLOB_HEADER_SIZE))
            .filter(|end| *end <= length)
            .ok_or_else(|| {
                Error::SignatureParse(format!("index of {} entries overruns SuperBlob", count))
            })?;

        let data = &data[..length];
        let entries = (SUPERBLOB_HEADER_SIZE..index_end)
            .step_by(INDEX_ENTRY_SIZE)
            .map(|pos| BlobIndex {
                slot_type: read_be_u32(data, pos).unwrap_or_default(),
                offset: read_be_u32(data, pos + 4).unwrap_or_default(),
            })
            .collect();

        Ok(Self { data, entries })
    }

    /// Total SuperBlob length as declared in its header.
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// The index entries in stored order.
    pub fn entries(&self) -> &[BlobIndex] {
        &self.entries
    }

    /// Look up the blob stored in `slot_type`, if the index has one.
    pub fn blob(&self, slot_type: u32) -> Result<Option<Blob<'a>>> {
        match self.entries.iter().find(|e| e.slot_type == slot_type) {
            Some(entry) => self.resolve(entry).map(Some),
            None => Ok(None),
        }
    }

    /// The primary CodeDirectory, falling back to the first alternate slot.
    pub fn code_directory(&self) -> Result<Option<Blob<'a>>> {
        if let Some(blob) = self.blob(CSSLOT_CODEDIRECTORY)? {
            return Ok(Some(blob));
        }
        for slot in CSSLOT_ALTERNATE_CODEDIRECTORIES..CSSLOT_ALTERNATE_CODEDIRECTORY_LIMIT {
            if let Some(blob) = self.blob(slot)? {
                return Ok(Some(blob));
            }
        }
        Ok(None)
    }

    fn resolve(&self, entry: &BlobIndex) -> Result<Blob<'a>> {
        let start = entry.offset as usize;
        let (magic, length) = match (read_be_u32(self.data, start), read_be_u32(self.data, start + 4)) {
            (Some(magic), Some(length)) => (magic, length as usize),
            _ => {
                return Err(Error::SignatureParse(format!(
                    "slot {:#x} offset {} is outside the SuperBlob",
                    entry.slot_type, start
                )))
            }
        };

        if length < BLOB_HEADER_SIZE || start + length > self.data.len() {
            return Err(Error::SignatureParse(format!(
                "slot {:#x} declares {} bytes at offset {} in a {}-byte SuperBlob",
                entry.slot_type,
                length,
                start,
                self.data.len()
            )));
        }

        Ok(Blob {
            slot_type: entry.slot_type,
            magic,
            data: &self.data[start..start + length],
        })
    }
}
