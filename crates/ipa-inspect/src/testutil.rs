//! Builders for synthetic packages, binaries and signature blobs.
//!
//! Shared by the unit tests and, through `tests/common`, the integration
//! tests, so it only depends on `std` and `zip`.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CPU_ARCH_ABI64: u32 = 0x0100_0000;

/// A blob with the 8-byte magic/length header.
pub fn build_blob(magic: u32, payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(8 + payload.len());
    blob.extend_from_slice(&magic.to_be_bytes());
    blob.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    blob.extend_from_slice(payload);
    blob
}

/// An embedded-signature SuperBlob holding `blobs` in the given order.
pub fn build_superblob(blobs: Vec<(u32, Vec<u8>)>) -> Vec<u8> {
    let header_len = 12 + blobs.len() * 8;
    let total = header_len + blobs.iter().map(|(_, b)| b.len()).sum::<usize>();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&0xfade0cc0u32.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(blobs.len() as u32).to_be_bytes());

    let mut offset = header_len;
    for (slot, blob) in &blobs {
        out.extend_from_slice(&slot.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        offset += blob.len();
    }
    for (_, blob) in blobs {
        out.extend(blob);
    }
    out
}

/// A version 0x20400 CodeDirectory with one SHA-256 code slot.
///
/// The identifier (and team, when given) are stored after the hashes, so the
/// blob always ends with a string terminator.
pub fn build_code_directory(identifier: &str, team_id: Option<&str>, flags: u32) -> Vec<u8> {
    const HEADER_LEN: usize = 88;
    const HASH_LEN: usize = 32;

    let ident_offset = HEADER_LEN + HASH_LEN;
    let team_offset = ident_offset + identifier.len() + 1;
    let length = team_offset + team_id.map(|t| t.len() + 1).unwrap_or(0);

    let mut cd = vec![0u8; HEADER_LEN];
    let mut put = |off: usize, value: u32| cd[off..off + 4].copy_from_slice(&value.to_be_bytes());
    put(0, 0xfade0c02);
    put(4, length as u32);
    put(8, 0x20400);
    put(12, flags);
    put(16, HEADER_LEN as u32);
    put(20, ident_offset as u32);
    put(24, 0);
    put(28, 1);
    put(32, 4096);
    put(48, if team_id.is_some() { team_offset as u32 } else { 0 });
    cd[36] = HASH_LEN as u8;
    cd[37] = 2;
    cd[39] = 12;

    cd.extend([0xab; HASH_LEN]);
    cd.extend_from_slice(identifier.as_bytes());
    cd.push(0);
    if let Some(team) = team_id {
        cd.extend_from_slice(team.as_bytes());
        cd.push(0);
    }
    cd
}

/// DER element with a definite length.
pub fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend([0x81, len as u8]);
    } else if len <= 0xffff {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    } else {
        out.extend([0x83, (len >> 16) as u8, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

/// A detached CMS SignedData whose certificate set holds `certificates`
/// byte-for-byte, damaged entries included.
pub fn build_cms(certificates: &[&[u8]]) -> Vec<u8> {
    const OID_SIGNED_DATA: [u8; 9] = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];
    const OID_DATA: [u8; 9] = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];

    let mut signed_data = der(0x02, &[1]);
    signed_data.extend(der(0x31, &[]));
    signed_data.extend(der(0x30, &der(0x06, &OID_DATA)));
    signed_data.extend(der(0xa0, &certificates.concat()));
    signed_data.extend(der(0x31, &[]));

    let mut content_info = der(0x06, &OID_SIGNED_DATA);
    content_info.extend(der(0xa0, &der(0x30, &signed_data)));
    der(0x30, &content_info)
}

/// A Mach-O executable for one CPU, little-endian, with an optional
/// `LC_CODE_SIGNATURE` pointing at `signature`.
pub fn build_macho(cpu_type: u32, cpu_subtype: u32, signature: Option<&[u8]>) -> Vec<u8> {
    let is_64 = cpu_type & CPU_ARCH_ABI64 != 0;
    let header_len = if is_64 { 32 } else { 28 };
    let (ncmds, cmds_len) = if signature.is_some() { (1u32, 16u32) } else { (0, 0) };

    let mut out = Vec::new();
    let magic: u32 = if is_64 { 0xfeedfacf } else { 0xfeedface };
    for word in [magic, cpu_type, cpu_subtype, 2, ncmds, cmds_len, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    if is_64 {
        out.extend_from_slice(&0u32.to_le_bytes());
    }
    debug_assert_eq!(out.len(), header_len);

    let sig_offset = (header_len + cmds_len as usize + 15) & !15;
    if let Some(sig) = signature {
        for word in [0x1d, 16, sig_offset as u32, sig.len() as u32] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.resize(sig_offset, 0);
        out.extend_from_slice(sig);
    } else {
        out.resize(64, 0);
    }
    out
}

/// A fat container with big-endian 32-bit arch entries, slices 16-byte aligned.
pub fn build_fat(slices: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xcafebabeu32.to_be_bytes());
    out.extend_from_slice(&(slices.len() as u32).to_be_bytes());

    let mut offset = (8 + slices.len() * 20 + 15) & !15;
    let mut placed = Vec::new();
    for (cpu_type, cpu_subtype, data) in slices {
        for word in [*cpu_type, *cpu_subtype, offset as u32, data.len() as u32, 4] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        placed.push(offset);
        offset = (offset + data.len() + 15) & !15;
    }
    for ((_, _, data), at) in slices.iter().zip(placed) {
        out.resize(at, 0);
        out.extend_from_slice(data);
    }
    out
}

/// Fluent builder for in-memory `.ipa` archives.
pub struct IpaBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl IpaBuilder {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.zip
            .add_directory(name, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.file_with_mode(name, data, 0o644)
    }

    pub fn executable(self, name: &str, data: &[u8]) -> Self {
        self.file_with_mode(name, data, 0o755)
    }

    pub fn file_with_mode(mut self, name: &str, data: &[u8], mode: u32) -> Self {
        let options = SimpleFileOptions::default().unix_permissions(mode);
        self.zip.start_file(name, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.zip
            .add_symlink(name, target, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for IpaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `Payload/<name>.app/` with an `Info.plist` and the given executable.
pub fn app_ipa(name: &str, executable: &[u8]) -> Vec<u8> {
    let app = format!("Payload/{}.app/", name);
    IpaBuilder::new()
        .dir("Payload/")
        .dir(&app)
        .file(
            &format!("{}Info.plist", app),
            b"<?xml version=\"1.0\"?><plist><dict></dict></plist>",
        )
        .executable(&format!("{}{}", app, name), executable)
        .finish()
}
