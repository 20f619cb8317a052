//! Hand-rolled ZIP writer for test fixtures.
//!
//! The engine under test is read-only, so fixtures are assembled here byte
//! by byte: local headers + data, then the central directory, then the
//! EOCD record. Knobs exist for the malformed shapes the parser must
//! reject (ZIP64 marker, encrypted entries) and the awkward ones it must
//! accept (comments, prepended junk, diverging local extra fields).

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::path::PathBuf;

pub const STORED: u16 = 0;
pub const DEFLATED: u16 = 8;

pub struct ZipBuilder {
    data: Vec<u8>,
    central: Vec<u8>,
    entries: u16,
}

#[allow(dead_code)]
impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            central: Vec::new(),
            entries: 0,
        }
    }

    pub fn add_stored(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        self.add_raw(name, payload, payload, STORED, 0, &[])
    }

    pub fn add_deflated(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        let compressed = encoder.finish().unwrap();
        self.add_raw(name, payload, &compressed, DEFLATED, 0, &[])
    }

    /// Entry flagged as encrypted (general purpose bit 0). The parser must
    /// reject it without looking at the data.
    pub fn add_encrypted(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        self.add_raw(name, payload, payload, STORED, 0x0001, &[])
    }

    /// Stored entry whose *local* header carries an extra field the central
    /// directory knows nothing about. Conflating the two lengths shifts
    /// the computed data offset.
    pub fn add_stored_with_local_extra(
        &mut self,
        name: &str,
        payload: &[u8],
        extra: &[u8],
    ) -> &mut Self {
        self.add_raw(name, payload, payload, STORED, 0, extra)
    }

    fn add_raw(
        &mut self,
        name: &str,
        payload: &[u8],
        stored_bytes: &[u8],
        method: u16,
        flags: u16,
        local_extra: &[u8],
    ) -> &mut Self {
        let mut crc = flate2::Crc::new();
        crc.update(payload);
        let crc32 = crc.sum();
        let lfh_offset = self.data.len() as u32;

        // Local file header.
        let d = &mut self.data;
        d.write_u32::<LittleEndian>(0x0403_4b50).unwrap();
        d.write_u16::<LittleEndian>(20).unwrap(); // version needed
        d.write_u16::<LittleEndian>(flags).unwrap();
        d.write_u16::<LittleEndian>(method).unwrap();
        d.write_u16::<LittleEndian>(0).unwrap(); // mod time
        d.write_u16::<LittleEndian>(0).unwrap(); // mod date
        d.write_u32::<LittleEndian>(crc32).unwrap();
        d.write_u32::<LittleEndian>(stored_bytes.len() as u32).unwrap();
        d.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        d.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        d.write_u16::<LittleEndian>(local_extra.len() as u16).unwrap();
        d.extend_from_slice(name.as_bytes());
        d.extend_from_slice(local_extra);
        d.extend_from_slice(stored_bytes);

        // Central directory record. Its extra length is deliberately left
        // at zero even when the local header has one.
        let c = &mut self.central;
        c.write_u32::<LittleEndian>(0x0201_4b50).unwrap();
        c.write_u16::<LittleEndian>(20).unwrap(); // version made by
        c.write_u16::<LittleEndian>(20).unwrap(); // version needed
        c.write_u16::<LittleEndian>(flags).unwrap();
        c.write_u16::<LittleEndian>(method).unwrap();
        c.write_u16::<LittleEndian>(0).unwrap();
        c.write_u16::<LittleEndian>(0).unwrap();
        c.write_u32::<LittleEndian>(crc32).unwrap();
        c.write_u32::<LittleEndian>(stored_bytes.len() as u32).unwrap();
        c.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        c.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        c.write_u16::<LittleEndian>(0).unwrap(); // extra len
        c.write_u16::<LittleEndian>(0).unwrap(); // comment len
        c.write_u16::<LittleEndian>(0).unwrap(); // disk number
        c.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
        c.write_u32::<LittleEndian>(0).unwrap(); // external attrs
        c.write_u32::<LittleEndian>(lfh_offset).unwrap();
        c.extend_from_slice(name.as_bytes());

        self.entries += 1;
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.finish_with_comment(&[])
    }

    pub fn finish_with_comment(&mut self, comment: &[u8]) -> Vec<u8> {
        self.finish_inner(comment, None)
    }

    /// Finish with the central-directory size set to the ZIP64 marker.
    pub fn finish_with_zip64_marker(&mut self) -> Vec<u8> {
        self.finish_inner(&[], Some(0xFFFF_FFFF))
    }

    fn finish_inner(&mut self, comment: &[u8], cd_size_override: Option<u32>) -> Vec<u8> {
        assert!(comment.len() <= 0xFFFF);
        let cd_offset = self.data.len() as u32;
        let cd_size = cd_size_override.unwrap_or(self.central.len() as u32);

        let mut out = std::mem::take(&mut self.data);
        out.extend_from_slice(&self.central);
        out.write_u32::<LittleEndian>(0x0605_4b50).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // disk number
        out.write_u16::<LittleEndian>(0).unwrap(); // disk with cd
        out.write_u16::<LittleEndian>(self.entries).unwrap();
        out.write_u16::<LittleEndian>(self.entries).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
        out.extend_from_slice(comment);
        out
    }
}

/// Write archive bytes to a file inside `dir` and return its path.
pub fn write_archive(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
