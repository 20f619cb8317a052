use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::io::Region;
use crate::zip::NESTED_SEPARATOR;
use crate::zip::eocd::EndOfCentralDirectory;

/// Central Directory File Header signature (PK\x01\x02) and minimum size.
const CDFH_SIGNATURE: u32 = 0x0201_4b50;
const CDFH_MIN_SIZE: u64 = 46;

/// Local File Header signature (PK\x03\x04) and fixed size.
const LFH_SIGNATURE: u32 = 0x0403_4b50;
const LFH_SIZE: u64 = 30;

/// General purpose flag bit 0: entry is encrypted.
const FLAG_ENCRYPTED: u16 = 0x0001;

/// ZIP compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflated,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflated,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflated => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Metadata for a single archive entry, immutable after the central
/// directory parse.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// Archive-relative entry name, e.g. `com/x/Y.class`.
    pub name: String,
    pub method: CompressionMethod,
    /// Declared size after decompression. Zip tooling is occasionally
    /// inconsistent about this field, so it seeds the decompression buffer
    /// rather than bounding it.
    pub uncompressed_size: u32,
    pub crc32: u32,
    /// The entry's (possibly compressed) data bytes.
    pub data: Region,
    /// Canonical name of the archive this entry lives in, which for a
    /// nested archive already contains `!/` separators.
    pub archive: String,
}

impl ZipEntry {
    /// Nesting-aware canonical name: `<archive>!/<entry>`.
    pub fn full_name(&self) -> String {
        format!("{}{}{}", self.archive, NESTED_SEPARATOR, self.name)
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Parsed view of one archive: every entry in central-directory order plus
/// a by-name lookup table. Built once, read-only afterwards.
pub struct ArchiveIndex {
    name: String,
    entries: Vec<ZipEntry>,
    by_name: HashMap<String, usize>,
    source: Region,
}

impl ArchiveIndex {
    /// Parse the central directory of the archive contained in `source`.
    ///
    /// `name` becomes the canonical prefix of every entry (for a nested
    /// archive it is the outer entry's own full name). `eocd_window` is the
    /// initial tail window for the EOCD scan.
    pub async fn parse(source: Region, name: String, eocd_window: u64) -> Result<Self> {
        let eocd = EndOfCentralDirectory::locate(&source, eocd_window).await?;
        trace!(
            archive = %name,
            cd_size = eocd.central_directory_size,
            start_of_archive = eocd.start_of_archive,
            "parsing central directory"
        );

        // The whole central directory is read in one request; only the
        // per-entry local header peek needs further reads.
        let cd_data = source
            .read(eocd.central_directory_offset, eocd.central_directory_size)
            .await?;
        if (cd_data.len() as u64) < eocd.central_directory_size {
            return Err(Error::MalformedArchive(
                "central directory is truncated".to_string(),
            ));
        }

        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        let mut cursor = Cursor::new(cd_data.as_slice());

        while cursor.position() + CDFH_MIN_SIZE <= cd_data.len() as u64 {
            let entry = parse_record(&mut cursor, &source, &eocd, &name).await?;
            by_name.entry(entry.name.clone()).or_insert(entries.len());
            entries.push(entry);
        }

        if entries.len() != usize::from(eocd.total_entries) {
            return Err(Error::MalformedArchive(format!(
                "central directory holds {} records but the end record declares {}",
                entries.len(),
                eocd.total_entries
            )));
        }

        Ok(Self {
            name,
            entries,
            by_name,
            source,
        })
    }

    /// Canonical name of this archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in central-directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Look up an entry by its archive-relative name.
    pub fn entry(&self, name: &str) -> Option<&ZipEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Region holding the raw bytes of the whole archive.
    pub fn source(&self) -> &Region {
        &self.source
    }
}

/// Parse one central-directory record at the cursor, resolving the entry's
/// data region through its local header.
async fn parse_record(
    cursor: &mut Cursor<&[u8]>,
    source: &Region,
    eocd: &EndOfCentralDirectory,
    archive_name: &str,
) -> Result<ZipEntry> {
    let signature = cursor.read_u32::<LittleEndian>()?;
    if signature != CDFH_SIGNATURE {
        return Err(Error::MalformedArchive(format!(
            "expected central directory record, found signature {signature:#010x}"
        )));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let compressed_size = cursor.read_u32::<LittleEndian>()?;
    let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
    let name_len = cursor.read_u16::<LittleEndian>()?;
    let extra_len = cursor.read_u16::<LittleEndian>()?;
    let comment_len = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let lfh_offset = cursor.read_u32::<LittleEndian>()?;

    // The variable tail must fit in the remaining directory bytes; a name
    // length running past the end means the record is cut short.
    let tail_len = u64::from(name_len) + u64::from(extra_len) + u64::from(comment_len);
    if cursor.position() + tail_len > cursor.get_ref().len() as u64 {
        return Err(Error::MalformedArchive(
            "central directory record is truncated".to_string(),
        ));
    }

    let mut name_bytes = vec![0u8; name_len as usize];
    cursor.read_exact(&mut name_bytes)?;
    let name = String::from_utf8_lossy(&name_bytes).to_string();

    // Advance past this record's variable tail before any early return so
    // the cursor always lands on the next record.
    let next_record = cursor.position() + u64::from(extra_len) + u64::from(comment_len);
    cursor.set_position(next_record);

    if flags & FLAG_ENCRYPTED != 0 {
        return Err(Error::UnsupportedFormat(format!(
            "entry '{name}' is encrypted"
        )));
    }
    if compressed_size == 0xFFFF_FFFF || uncompressed_size == 0xFFFF_FFFF {
        return Err(Error::UnsupportedFormat(format!(
            "entry '{name}' uses ZIP64 sizes"
        )));
    }

    // The local header's own name/extra lengths decide where the data
    // starts; the extra field in particular can differ from the central
    // directory's copy.
    let lfh_pos = eocd.start_of_archive + u64::from(lfh_offset);
    let lfh = source.read(lfh_pos, LFH_SIZE).await?;
    if (lfh.len() as u64) < LFH_SIZE {
        return Err(Error::MalformedArchive(format!(
            "local header of entry '{name}' is truncated"
        )));
    }
    let mut lfh_cursor = Cursor::new(lfh.as_slice());
    if lfh_cursor.read_u32::<LittleEndian>()? != LFH_SIGNATURE {
        return Err(Error::MalformedArchive(format!(
            "entry '{name}' has an invalid local header"
        )));
    }
    lfh_cursor.set_position(26);
    let local_name_len = lfh_cursor.read_u16::<LittleEndian>()?;
    let local_extra_len = lfh_cursor.read_u16::<LittleEndian>()?;

    let data_offset =
        lfh_pos + LFH_SIZE + u64::from(local_name_len) + u64::from(local_extra_len);
    let data = source.subsection(data_offset, u64::from(compressed_size))?;

    Ok(ZipEntry {
        name,
        method: CompressionMethod::from_u16(method),
        uncompressed_size,
        crc32,
        data,
        archive: archive_name.to_string(),
    })
}
