//! Apple code signing constants and magic numbers
//!
//! These constants define the binary layout of embedded code signatures:
//! SuperBlob and blob magics, slot types, CodeDirectory versions, flags
//! and hash types.

// =============================================================================
// Blob Magic Numbers
// =============================================================================

/// SuperBlob containing all signature components (embedded signature)
pub const CSMAGIC_EMBEDDED_SIGNATURE: u32 = 0xfade0cc0;

/// CodeDirectory blob magic
pub const CSMAGIC_CODEDIRECTORY: u32 = 0xfade0c02;

/// Requirements blob magic
pub const CSMAGIC_REQUIREMENTS: u32 = 0xfade0c01;

/// Embedded entitlements (XML plist format)
pub const CSMAGIC_EMBEDDED_ENTITLEMENTS: u32 = 0xfade7171;

/// Embedded DER entitlements (ASN.1 DER format)
pub const CSMAGIC_EMBEDDED_DER_ENTITLEMENTS: u32 = 0xfade7172;

/// CMS signature wrapper blob
pub const CSMAGIC_BLOBWRAPPER: u32 = 0xfade0b01;

// =============================================================================
// Slot Types (for SuperBlob index)
// =============================================================================

/// Main code directory slot
pub const CSSLOT_CODEDIRECTORY: u32 = 0x0000;

/// Code requirements slot
pub const CSSLOT_REQUIREMENTS: u32 = 0x0002;

/// Entitlements slot (XML format)
pub const CSSLOT_ENTITLEMENTS: u32 = 0x0005;

/// DER entitlements slot
pub const CSSLOT_DER_ENTITLEMENTS: u32 = 0x0007;

/// Alternate code directories start (SHA-256, SHA-384, etc.)
pub const CSSLOT_ALTERNATE_CODEDIRECTORIES: u32 = 0x1000;

/// Maximum number of alternate code directories
pub const CSSLOT_ALTERNATE_CODEDIRECTORY_MAX: u32 = 5;

/// Limit for alternate code directory slots
pub const CSSLOT_ALTERNATE_CODEDIRECTORY_LIMIT: u32 =
    CSSLOT_ALTERNATE_CODEDIRECTORIES + CSSLOT_ALTERNATE_CODEDIRECTORY_MAX;

/// CMS signature slot
pub const CSSLOT_SIGNATURESLOT: u32 = 0x10000;

// =============================================================================
// Hash Types
// =============================================================================

/// No hash (placeholder)
pub const CS_HASHTYPE_NOHASH: u8 = 0;

/// SHA-1 hash (160-bit / 20 bytes)
pub const CS_HASHTYPE_SHA1: u8 = 1;

/// SHA-256 hash (256-bit / 32 bytes)
pub const CS_HASHTYPE_SHA256: u8 = 2;

/// SHA-256 truncated to 20 bytes (legacy compatibility)
pub const CS_HASHTYPE_SHA256_TRUNCATED: u8 = 3;

/// SHA-384 hash (384-bit / 48 bytes)
pub const CS_HASHTYPE_SHA384: u8 = 4;

/// SHA-512 hash (512-bit / 64 bytes)
pub const CS_HASHTYPE_SHA512: u8 = 5;

/// Name of a CodeDirectory hash type as `codesign` prints it.
pub fn hash_type_name(hash_type: u8) -> &'static str {
    match hash_type {
        CS_HASHTYPE_NOHASH => "none",
        CS_HASHTYPE_SHA1 => "sha1",
        CS_HASHTYPE_SHA256 => "sha256",
        CS_HASHTYPE_SHA256_TRUNCATED => "sha256-truncated",
        CS_HASHTYPE_SHA384 => "sha384",
        CS_HASHTYPE_SHA512 => "sha512",
        _ => "unknown",
    }
}

// =============================================================================
// Code Signature Flags
// =============================================================================

/// Ad-hoc signed (no identity)
pub const CS_ADHOC: u32 = 0x00000002;

/// Linker-signed (ad-hoc signature produced by ld)
pub const CS_LINKER_SIGNED: u32 = 0x00020000;

// =============================================================================
// CodeDirectory Version
// =============================================================================

/// Earliest supported CodeDirectory version
pub const CODEDIRECTORY_VERSION_EARLIEST: u32 = 0x20001;

/// Version with team ID support
pub const CODEDIRECTORY_VERSION_TEAMID: u32 = 0x20200;

/// Fixed part of a CodeDirectory up to and including `spare2`
pub const CODEDIRECTORY_MIN_SIZE: usize = 44;

// =============================================================================
// Mach-O / FAT Magic Numbers
// =============================================================================

/// FAT header magic (always stored big-endian)
pub const FAT_MAGIC: u32 = 0xcafebabe;

/// FAT header magic with 64-bit offsets
pub const FAT_MAGIC_64: u32 = 0xcafebabf;

/// 32-bit Mach-O magic
pub const MH_MAGIC: u32 = 0xfeedface;

/// 32-bit Mach-O magic, byte-swapped
pub const MH_CIGAM: u32 = 0xcefaedfe;

/// 64-bit Mach-O magic
pub const MH_MAGIC_64: u32 = 0xfeedfacf;

/// 64-bit Mach-O magic, byte-swapped
pub const MH_CIGAM_64: u32 = 0xcffaedfe;

// =============================================================================
// CPU Types
// =============================================================================

/// Flag marking a 64-bit ABI CPU type
pub const CPU_ARCH_ABI64: u32 = 0x0100_0000;

/// Flag marking an ILP32 ABI on a 64-bit CPU
pub const CPU_ARCH_ABI64_32: u32 = 0x0200_0000;

/// Capability bits in the CPU subtype
pub const CPU_SUBTYPE_MASK: u32 = 0xff00_0000;

pub const CPU_TYPE_X86: u32 = 7;
pub const CPU_TYPE_X86_64: u32 = CPU_TYPE_X86 | CPU_ARCH_ABI64;
pub const CPU_TYPE_ARM: u32 = 12;
pub const CPU_TYPE_ARM64: u32 = CPU_TYPE_ARM | CPU_ARCH_ABI64;
pub const CPU_TYPE_ARM64_32: u32 = CPU_TYPE_ARM | CPU_ARCH_ABI64_32;
pub const CPU_TYPE_POWERPC: u32 = 18;
pub const CPU_TYPE_POWERPC64: u32 = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

pub const CPU_SUBTYPE_ARM_V6: u32 = 6;
pub const CPU_SUBTYPE_ARM_V7: u32 = 9;
pub const CPU_SUBTYPE_ARM_V7S: u32 = 11;
pub const CPU_SUBTYPE_ARM_V7K: u32 = 12;
pub const CPU_SUBTYPE_ARM64E: u32 = 2;
pub const CPU_SUBTYPE_X86_64_H: u32 = 8;

// =============================================================================
// Load Commands
// =============================================================================

/// Code signature load command
pub const LC_CODE_SIGNATURE: u32 = 0x1d;
