//! CodeDirectory blob parsing for Apple code signing
//!
//! The CodeDirectory is the core data structure of an embedded signature.
//! Besides the page hashes it names the signed code (`identifier`, usually the
//! bundle identifier) and, from version 0x20200 on, the signing team.
//!
//! Layout of the fixed header (all fields big-endian):
//!
//! ```text
//! offset  field
//!      0  magic            0xfade0c02
//!      4  length
//!      8  version
//!     12  flags
//!     16  hashOffset
//!     20  identOffset
//!     24  nSpecialSlots
//!     28  nCodeSlots
//!     32  codeLimit
//!     36  hashSize (u8)
//!     37  hashType (u8)
//!     38  platform (u8)
//!     39  pageSize (u8, log2)
//!     40  spare2
//!     44  scatterOffset    (>= 0x20100)
//!     48  teamOffset       (>= 0x20200)
//! ```

use super::constants::*;
use super::read_be_u32;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

const TEAM_OFFSET_FIELD: usize = 48;

/// Fields read from a CodeDirectory blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDirectory {
    pub version: u32,
    pub flags: u32,
    pub length: u32,
    pub hash_type: u8,
    pub hash_size: u8,
    /// log2 of the page size, 0 for a single unpaged hash
    pub page_size_log2: u8,
    pub n_special_slots: u32,
    pub n_code_slots: u32,
    pub code_limit: u32,
    /// Signing identifier, normally the bundle identifier
    pub identifier: String,
    /// Team identifier, present from version 0x20200 when the signer has one
    pub team_id: Option<String>,
}

impl CodeDirectory {
    /// Parse a CodeDirectory from its blob bytes (magic and length included).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureParse`] when the magic is wrong, the header
    /// is shorter than the fixed part, the declared length does not match, or
    /// the identifier strings run past the blob.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        let field = |off: usize| {
            read_be_u32(blob, off).ok_or_else(|| {
                Error::SignatureParse(format!("CodeDirectory truncated at offset {}", off))
            })
        };

        let magic = field(0)?;
        if magic != CSMAGIC_CODEDIRECTORY {
            return Err(Error::SignatureParse(format!(
                "bad CodeDirectory magic {:#010x}",
                magic
            )));
        }

        let length = field(4)?;
        if (length as usize) < CODEDIRECTORY_MIN_SIZE || length as usize > blob.len() {
            return Err(Error::SignatureParse(format!(
                "CodeDirectory length {} does not fit blob of {} bytes",
                length,
                blob.len()
            )));
        }
        let blob = &blob[..length as usize];

        let version = field(8)?;
        if version < CODEDIRECTORY_VERSION_EARLIEST {
            return Err(Error::SignatureParse(format!(
                "unsupported CodeDirectory version {:#x}",
                version
            )));
        }

        let ident_offset = field(20)? as usize;
        let identifier = read_c_string(blob, ident_offset)?;

        let team_id = if version >= CODEDIRECTORY_VERSION_TEAMID {
            match field(TEAM_OFFSET_FIELD)? as usize {
                0 => None,
                off => Some(read_c_string(blob, off)?),
            }
        } else {
            None
        };

        Ok(Self {
            version,
            flags: field(12)?,
            length,
            n_special_slots: field(24)?,
            n_code_slots: field(28)?,
            code_limit: field(32)?,
            hash_size: blob[36],
            hash_type: blob[37],
            page_size_log2: blob[39],
            identifier,
            team_id,
        })
    }

    /// Ad-hoc signatures carry no signing identity.
    pub fn is_adhoc(&self) -> bool {
        self.flags & CS_ADHOC != 0
    }

    /// Whether the linker, not `codesign`, produced this signature.
    pub fn is_linker_signed(&self) -> bool {
        self.flags & CS_LINKER_SIGNED != 0
    }

    pub fn summary(&self) -> CodeDirectorySummary {
        CodeDirectorySummary {
            version: self.version,
            flags: self.flags,
            size: self.length,
            hash_type: hash_type_name(self.hash_type).to_string(),
            code_slots: self.n_code_slots,
            special_slots: self.n_special_slots,
        }
    }
}

/// The CodeDirectory facts reported alongside a signer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeDirectorySummary {
    pub version: u32,
    pub flags: u32,
    pub size: u32,
    pub hash_type: String,
    pub code_slots: u32,
    pub special_slots: u32,
}

impl fmt::Display for CodeDirectorySummary {
    /// Formats the way `codesign -dv` prints its CodeDirectory line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v={:x} size={} flags={:#x} hashes={}+{} hash={}",
            self.version,
            self.size,
            self.flags,
            self.code_slots,
            self.special_slots,
            self.hash_type
        )
    }
}

fn read_c_string(blob: &[u8], offset: usize) -> Result<String> {
    let bytes = blob.get(offset..).ok_or_else(|| {
        Error::SignatureParse(format!("string offset {} outside CodeDirectory", offset))
    })?;
    let end = bytes
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| Error::SignatureParse("unterminated CodeDirectory string".into()))?;
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}
