use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::RandomAccess;

/// An immutable view over a byte range of a backing random-access store.
///
/// Many regions may share one backing handle; a region is cheap to clone and
/// never outlives its backing (the handle is reference-counted). All reads
/// are bounds-checked against the region's own length, not the backing
/// store's.
#[derive(Clone)]
pub struct Region {
    backing: Arc<dyn RandomAccess>,
    base_offset: u64,
    length: u64,
}

impl Region {
    /// Create a region spanning the entire backing store.
    pub fn new(backing: Arc<dyn RandomAccess>) -> Self {
        let length = backing.size();
        Self {
            backing,
            base_offset: 0,
            length,
        }
    }

    /// Length of the region in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Derive a sub-region relative to this one.
    ///
    /// Fails if `offset + length` extends past the end of this region;
    /// entry metadata pointing outside its archive is malformed, not a
    /// read-time surprise.
    pub fn subsection(&self, offset: u64, length: u64) -> Result<Region> {
        let end = offset
            .checked_add(length)
            .ok_or_else(|| Error::MalformedArchive("region range overflows u64".to_string()))?;
        if end > self.length {
            return Err(Error::MalformedArchive(format!(
                "subsection {offset}+{length} exceeds region of {} bytes",
                self.length
            )));
        }
        Ok(Region {
            backing: Arc::clone(&self.backing),
            base_offset: self.base_offset + offset,
            length,
        })
    }

    /// Read up to `length` bytes starting at `offset` within the region.
    ///
    /// Returns fewer bytes only when the range extends past the end of the
    /// region (true end-of-stream), never because of buffering. An offset
    /// beyond the region yields an empty buffer.
    pub async fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        if offset >= self.length {
            return Ok(Vec::new());
        }
        let available = (self.length - offset).min(length);
        let mut buf = vec![0u8; available as usize];
        let mut filled = 0usize;

        // The backing store may return short reads; loop until the buffer
        // is full or the store signals end-of-stream.
        while filled < buf.len() {
            let n = self
                .backing
                .read_at(self.base_offset + offset + filled as u64, &mut buf[filled..])
                .await?;
            if n == 0 {
                buf.truncate(filled);
                break;
            }
            filled += n;
        }
        Ok(buf)
    }

    /// Read the whole region into memory.
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        self.read(0, self.length).await
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("base_offset", &self.base_offset)
            .field("length", &self.length)
            .finish()
    }
}
