//! ZIP archive reading.
//!
//! Everything here works against a [`Region`](crate::io::Region) rather than
//! a file, so an archive can live anywhere random access is possible: a
//! local file, a remote file behind HTTP Range requests, or a Stored entry
//! inside another archive.
//!
//! ## Reading order
//!
//! ZIP files are designed to be read from the end:
//! 1. Locate the End of Central Directory (EOCD) record in the file's tail
//! 2. Walk the Central Directory it points at to index every entry
//! 3. For each entry, re-read the Local File Header to find where the
//!    actual data starts (its extra field can differ in length from the
//!    central directory's copy)
//!
//! ## Limitations
//!
//! - No ZIP64 (rejected explicitly, never silently truncated)
//! - No encryption
//! - STORED and DEFLATE methods only

mod eocd;
mod index;
mod inflate;

pub use eocd::EndOfCentralDirectory;
pub use index::{ArchiveIndex, CompressionMethod, ZipEntry};
pub use inflate::inflate_raw;

/// Separator between nesting levels in canonical entry names.
pub const NESTED_SEPARATOR: &str = "!/";
