//! Mach-O file parsing using goblin

use crate::{Error, Result};
use goblin::mach::header::{MH_CIGAM_64, MH_MAGIC_64};
use goblin::mach::load_command::CommandVariant;
use goblin::mach::{Mach, MachO};

/// Represents a parsed Mach-O file, thin or fat
pub struct MachOFile<'a> {
    /// Raw file data
    data: &'a [u8],
    /// Is FAT binary
    is_fat: bool,
    /// Architecture slices
    slices: Vec<ArchSlice>,
}

/// A single architecture slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchSlice {
    /// Offset in file
    pub offset: usize,
    /// Size of slice
    pub size: usize,
    /// CPU type
    pub cpu_type: u32,
    /// CPU subtype, capability bits included
    pub cpu_subtype: u32,
    /// Is 64-bit
    pub is_64: bool,
    /// Code signature offset relative to the slice (if exists)
    pub code_sig_offset: Option<u32>,
    /// Code signature size
    pub code_sig_size: Option<u32>,
}

impl<'a> MachOFile<'a> {
    /// Parse Mach-O from bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedBinaryFormat`] if goblin cannot read the
    /// container or any of its slices.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mach = Mach::parse(data)
            .map_err(|e| Error::UnrecognizedBinaryFormat(format!("Failed to parse: {}", e)))?;

        let (is_fat, slices) = match mach {
            Mach::Binary(macho) => {
                let slice = Self::parse_single(&macho, 0, data.len());
                (false, vec![slice])
            }
            Mach::Fat(fat) => {
                let mut slices = Vec::new();
                for (i, arch) in fat.iter_arches().enumerate() {
                    let arch = arch.map_err(|e| {
                        Error::UnrecognizedBinaryFormat(format!("Fat arch {}: {}", i, e))
                    })?;
                    let offset = arch.offset as usize;
                    let size = arch.size as usize;
                    let slice_data = offset
                        .checked_add(size)
                        .and_then(|end| data.get(offset..end))
                        .ok_or_else(|| {
                            Error::UnrecognizedBinaryFormat(format!(
                                "Slice {} ({} bytes at {}) exceeds file",
                                i, size, offset
                            ))
                        })?;

                    let macho = MachO::parse(slice_data, 0).map_err(|e| {
                        Error::UnrecognizedBinaryFormat(format!("Slice {}: {}", i, e))
                    })?;

                    slices.push(Self::parse_single(&macho, offset, size));
                }
                (true, slices)
            }
        };

        Ok(Self { data, is_fat, slices })
    }

    fn parse_single(macho: &MachO, offset: usize, size: usize) -> ArchSlice {
        let is_64 = macho.header.magic == MH_MAGIC_64 || macho.header.magic == MH_CIGAM_64;

        let mut code_sig_offset = None;
        let mut code_sig_size = None;

        for lc in &macho.load_commands {
            if let CommandVariant::CodeSignature(cs) = lc.command {
                code_sig_offset = Some(cs.dataoff);
                code_sig_size = Some(cs.datasize);
            }
        }

        ArchSlice {
            offset,
            size,
            cpu_type: macho.header.cputype as u32,
            cpu_subtype: macho.header.cpusubtype as u32,
            is_64,
            code_sig_offset,
            code_sig_size,
        }
    }

    /// Is FAT binary
    pub fn is_fat(&self) -> bool {
        self.is_fat
    }

    /// Get architecture slices
    pub fn slices(&self) -> &[ArchSlice] {
        &self.slices
    }

    /// First slice that carries `LC_CODE_SIGNATURE`.
    pub fn signed_slice(&self) -> Option<&ArchSlice> {
        self.slices.iter().find(|s| s.code_sig_offset.is_some())
    }

    /// Bytes of a slice's code signature region.
    ///
    /// `Ok(None)` when the slice has no `LC_CODE_SIGNATURE`; an error when the
    /// command points outside the slice.
    pub fn signature_bytes(&self, slice: &ArchSlice) -> Result<Option<&'a [u8]>> {
        let (offset, size) = match (slice.code_sig_offset, slice.code_sig_size) {
            (Some(offset), Some(size)) => (offset as usize, size as usize),
            _ => return Ok(None),
        };

        if offset + size > slice.size {
            return Err(Error::SignatureParse(format!(
                "LC_CODE_SIGNATURE ({} bytes at {}) exceeds {}-byte slice",
                size, offset, slice.size
            )));
        }

        let start = slice.offset + offset;
        self.data
            .get(start..start + size)
            .map(Some)
            .ok_or_else(|| Error::SignatureParse("code signature outside file".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codesign::constants::*;
    use crate::testutil::{build_fat, build_macho};

    #[test]
    fn test_parse_minimal() {
        let result = MachOFile::parse(&[0; 100]);
        assert!(matches!(result, Err(Error::UnrecognizedBinaryFormat(_))));
    }

    #[test]
    fn test_thin_unsigned() {
        let data = build_macho(CPU_TYPE_ARM64, 0, None);
        let macho = MachOFile::parse(&data).unwrap();

        assert!(!macho.is_fat());
        assert_eq!(macho.slices().len(), 1);
        assert!(macho.slices()[0].is_64);
        assert!(macho.signed_slice().is_none());
        assert_eq!(macho.signature_bytes(&macho.slices()[0]).unwrap(), None);
    }

    #[test]
    fn test_thin_signature_bytes() {
        let data = build_macho(CPU_TYPE_ARM64, 0, Some(b"SIGNATURE"));
        let macho = MachOFile::parse(&data).unwrap();
        let slice = macho.signed_slice().unwrap();

        assert_eq!(slice.code_sig_size, Some(9));
        assert_eq!(macho.signature_bytes(slice).unwrap(), Some(&b"SIGNATURE"[..]));
    }

    #[test]
    fn test_fat_signed_slice_offsets() {
        let armv7 = build_macho(CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V7, None);
        let arm64 = build_macho(CPU_TYPE_ARM64, 0, Some(b"SIG64"));
        let data = build_fat(&[
            (CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V7, armv7),
            (CPU_TYPE_ARM64, 0, arm64),
        ]);

        let macho = MachOFile::parse(&data).unwrap();
        assert!(macho.is_fat());
        assert_eq!(macho.slices().len(), 2);
        assert!(!macho.slices()[0].is_64);

        let slice = macho.signed_slice().unwrap();
        assert_eq!(slice.cpu_type, CPU_TYPE_ARM64);
        assert_eq!(macho.signature_bytes(slice).unwrap(), Some(&b"SIG64"[..]));
    }

    #[test]
    fn test_signature_outside_slice() {
        let data = build_macho(CPU_TYPE_ARM64, 0, Some(b"SIGNATURE"));
        let macho = MachOFile::parse(&data).unwrap();
        let mut slice = macho.signed_slice().unwrap().clone();
        slice.code_sig_size = Some(4096);

        assert!(matches!(
            macho.signature_bytes(&slice),
            Err(Error::SignatureParse(_))
        ));
    }
}
