//! Architecture detection from Mach-O and fat headers.
//!
//! Only the leading header bytes are read. Fat headers are always
//! big-endian; a thin header's byte order follows from which magic variant
//! it starts with.

use crate::codesign::constants::*;
use crate::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header bytes read from disk; covers any realistic fat arch table.
const HEADER_PREFIX_LEN: u64 = 64 * 1024;

const FAT_ARCH_SIZE: usize = 20;
const FAT_ARCH_64_SIZE: usize = 32;

/// Ordered, duplicate-free architecture names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArchitectureSet(Vec<String>);

impl ArchitectureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless it is already present.
    pub fn insert(&mut self, name: String) -> bool {
        if self.0.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Symbolic name for a CPU type/subtype pair, as `lipo` prints it.
pub fn arch_name(cpu_type: u32, cpu_subtype: u32) -> String {
    let subtype = cpu_subtype & !CPU_SUBTYPE_MASK;
    let name = match (cpu_type, subtype) {
        (CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V6) => "armv6",
        (CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V7) => "armv7",
        (CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V7S) => "armv7s",
        (CPU_TYPE_ARM, CPU_SUBTYPE_ARM_V7K) => "armv7k",
        (CPU_TYPE_ARM, _) => "arm",
        (CPU_TYPE_ARM64, CPU_SUBTYPE_ARM64E) => "arm64e",
        (CPU_TYPE_ARM64, _) => "arm64",
        (CPU_TYPE_ARM64_32, _) => "arm64_32",
        (CPU_TYPE_X86, _) => "i386",
        (CPU_TYPE_X86_64, CPU_SUBTYPE_X86_64_H) => "x86_64h",
        (CPU_TYPE_X86_64, _) => "x86_64",
        (CPU_TYPE_POWERPC, _) => "ppc",
        (CPU_TYPE_POWERPC64, _) => "ppc64",
        _ => return format!("unknown({:#x})", cpu_type),
    };
    name.to_string()
}

/// Architectures of the binary at `path`.
pub fn inspect_architectures(path: &Path) -> Result<ArchitectureSet> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let mut header = Vec::new();
    file.take(HEADER_PREFIX_LEN)
        .read_to_end(&mut header)
        .map_err(|e| Error::io_at(path, e))?;
    architectures_from_bytes(&header)
}

/// Architectures described by the header at the start of `data`.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedBinaryFormat`] for an unknown magic, an empty
/// fat table, or a fat table that runs past `data`.
pub fn architectures_from_bytes(data: &[u8]) -> Result<ArchitectureSet> {
    let magic_bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::UnrecognizedBinaryFormat("file shorter than a magic number".into()))?;

    match u32::from_be_bytes(magic_bytes) {
        FAT_MAGIC => fat_architectures(data, FAT_ARCH_SIZE),
        FAT_MAGIC_64 => fat_architectures(data, FAT_ARCH_64_SIZE),
        MH_MAGIC | MH_MAGIC_64 => thin_architecture(data, u32::from_be_bytes),
        MH_CIGAM | MH_CIGAM_64 => thin_architecture(data, u32::from_le_bytes),
        other => Err(Error::UnrecognizedBinaryFormat(format!(
            "unknown magic {:#010x}",
            other
        ))),
    }
}

fn word(data: &[u8], offset: usize, decode: fn([u8; 4]) -> u32) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(decode([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn thin_architecture(data: &[u8], decode: fn([u8; 4]) -> u32) -> Result<ArchitectureSet> {
    match (word(data, 4, decode), word(data, 8, decode)) {
        (Some(cpu_type), Some(cpu_subtype)) => {
            let mut set = ArchitectureSet::new();
            set.insert(arch_name(cpu_type, cpu_subtype));
            Ok(set)
        }
        _ => Err(Error::UnrecognizedBinaryFormat("truncated Mach-O header".into())),
    }
}

fn fat_architectures(data: &[u8], entry_size: usize) -> Result<ArchitectureSet> {
    let count = word(data, 4, u32::from_be_bytes)
        .ok_or_else(|| Error::UnrecognizedBinaryFormat("truncated fat header".into()))?
        as usize;
    if count == 0 {
        return Err(Error::UnrecognizedBinaryFormat("fat header lists no architectures".into()));
    }

    let mut set = ArchitectureSet::new();
    for i in 0..count {
        let base = 8 + i * entry_size;
        match (word(data, base, u32::from_be_bytes), word(data, base + 4, u32::from_be_bytes)) {
            (Some(cpu_type), Some(cpu_subtype)) => {
                set.insert(arch_name(cpu_type, cpu_subtype));
            }
            _ => {
                return Err(Error::UnrecognizedBinaryFormat(format!(
                    "fat table of {} entries is truncated",
                    count
                )))
            }
        }
    }
    Ok(set)
}
