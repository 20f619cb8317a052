use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::Region;

/// End of Central Directory record, located and corrected.
///
/// The declared central-directory offset in the record counts from the
/// start of the ZIP data, but self-extracting or re-packaged archives may
/// prepend arbitrary bytes before that. The locator therefore derives the
/// true start of archive from where the central directory *actually* sits
/// (`EOCD position - declared size`) and every downstream offset is
/// corrected by it.
#[derive(Debug, Clone, Copy)]
pub struct EndOfCentralDirectory {
    /// Size of the central directory in bytes.
    pub central_directory_size: u64,
    /// Actual position of the central directory within the region.
    pub central_directory_offset: u64,
    /// Offset of the first byte of real ZIP data within the region.
    pub start_of_archive: u64,
    /// Declared number of central-directory records.
    pub total_entries: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4b50;
    /// Fixed record size, excluding the trailing comment.
    pub const MIN_SIZE: u64 = 22;

    /// Locate the EOCD record by scanning backward from the end of the
    /// region.
    ///
    /// The comment length (0-65535 bytes) is only self-describing once the
    /// record is found, so candidates are probed back-to-front. A candidate
    /// is accepted only if the signature matches *and* its declared comment
    /// length places the record exactly at the end of the region; the
    /// cross-check rejects signature bytes that happen to occur inside
    /// binary comment data. The scan window starts small and grows by x1.5
    /// until the record is found or the whole region has been covered.
    pub async fn locate(region: &Region, initial_window: u64) -> Result<Self> {
        let size = region.len();
        if size < Self::MIN_SIZE {
            return Err(Error::MalformedArchive(format!(
                "{size} bytes is too small to hold an end-of-central-directory record"
            )));
        }

        let initial_window = initial_window.max(Self::MIN_SIZE);
        let mut window = initial_window.min(size);
        let mut block = region.read(size - window, window).await?;
        // Distance from the end of the region back to the candidate record.
        let mut tail = Self::MIN_SIZE;

        let record_at = loop {
            if tail > block.len() as u64 {
                if window >= size {
                    return Err(Error::MalformedArchive(
                        "no end-of-central-directory record found".to_string(),
                    ));
                }
                window = (window * 3 / 2).min(size);
                block = region.read(size - window, window).await?;
            }

            let at = block.len() - tail as usize;
            let signature = LittleEndian::read_u32(&block[at..at + 4]);
            let comment_len = u64::from(LittleEndian::read_u16(&block[at + 20..at + 22]));
            if signature == Self::SIGNATURE && comment_len + Self::MIN_SIZE == tail {
                break at;
            }
            tail += 1;
        };

        let total_entries = LittleEndian::read_u16(&block[record_at + 10..record_at + 12]);
        let cd_size = u64::from(LittleEndian::read_u32(&block[record_at + 12..record_at + 16]));
        let declared_offset =
            u64::from(LittleEndian::read_u32(&block[record_at + 16..record_at + 20]));

        if cd_size == 0xFFFF_FFFF || declared_offset == 0xFFFF_FFFF || total_entries == 0xFFFF {
            return Err(Error::UnsupportedFormat(
                "ZIP64 archives are not supported".to_string(),
            ));
        }

        let record_offset = size - tail;
        let central_directory_offset = record_offset.checked_sub(cd_size).ok_or_else(|| {
            Error::MalformedArchive(format!(
                "declared central directory size {cd_size} extends before start of data"
            ))
        })?;
        let start_of_archive = central_directory_offset
            .checked_sub(declared_offset)
            .ok_or_else(|| {
                Error::MalformedArchive(format!(
                    "declared central directory offset {declared_offset} is inconsistent"
                ))
            })?;

        Ok(Self {
            central_directory_size: cd_size,
            central_directory_offset,
            start_of_archive,
            total_entries,
        })
    }
}
