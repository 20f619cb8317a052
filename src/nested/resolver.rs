use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::Region;
use crate::nested::ResolverConfig;
use crate::zip::{ArchiveIndex, CompressionMethod, ZipEntry, inflate_raw};

/// One lookup table over every entry reachable from the outermost archive,
/// keyed by archive-relative entry name.
///
/// Collisions across nesting levels resolve first-seen-wins in traversal
/// order, so a name defined in the outer archive shadows the same name in
/// any nested archive. Replaced wholesale on cache refresh, never mutated.
pub(crate) type FlattenedIndex = HashMap<String, ZipEntry>;

/// Whether an entry is eligible for recursive traversal: its name carries
/// the container suffix and it is Stored. Deflated containers cannot be
/// randomly addressed without full decompression, so they stay opaque.
fn is_container(entry: &ZipEntry, suffix: &str) -> bool {
    !entry.is_directory()
        && entry.name.ends_with(suffix)
        && entry.method == CompressionMethod::Stored
}

/// Flatten the archive tree rooted at `source` into one map.
///
/// The walk is iterative (a work stack of parsed indexes, one flat output
/// table) rather than a linked graph of index objects: each level's entries
/// are inserted in central-directory order, then its Stored sub-containers
/// are visited depth-first in that same order.
pub(crate) async fn build_flattened(
    source: Region,
    name: String,
    config: &ResolverConfig,
) -> Result<FlattenedIndex> {
    let mut flat = FlattenedIndex::new();
    let mut pending = vec![ArchiveIndex::parse(source, name, config.eocd_window).await?];

    while let Some(archive) = pending.pop() {
        let mut nested = Vec::new();
        for entry in archive.entries() {
            if !flat.contains_key(&entry.name) {
                flat.insert(entry.name.clone(), entry.clone());
            }
            if is_container(entry, &config.container_suffix) {
                nested
                    .push(ArchiveIndex::parse(entry.data.clone(), entry.full_name(), config.eocd_window).await?);
            }
        }
        // Reversed so the stack pops sub-archives in entry order.
        pending.extend(nested.into_iter().rev());
    }

    debug!(entries = flat.len(), "flattened nested index built");
    Ok(flat)
}

/// Read and, if necessary, decompress an entry's bytes.
pub(crate) async fn read_entry(entry: &ZipEntry) -> Result<Vec<u8>> {
    let raw = entry.data.read_all().await?;
    match entry.method {
        CompressionMethod::Stored => Ok(raw),
        CompressionMethod::Deflated => {
            inflate_raw(&raw, entry.uncompressed_size as usize, &entry.full_name())
        }
        CompressionMethod::Unknown(value) => Err(Error::UnsupportedFormat(format!(
            "entry '{}' uses compression method {value}",
            entry.full_name()
        ))),
    }
}

/// Follow an explicit nested path, one archive level per segment.
///
/// Every intermediate segment must be a Stored entry: descending through a
/// Deflated one would require decompressing it wholesale and is refused.
/// Returns `Ok(None)` when any segment does not exist.
pub(crate) async fn descend(
    source: Region,
    root_name: String,
    segments: &[String],
    config: &ResolverConfig,
) -> Result<Option<Vec<u8>>> {
    let Some((leaf, containers)) = segments.split_last() else {
        return Ok(None);
    };

    let mut region = source;
    let mut name = root_name;
    for segment in containers {
        let index = ArchiveIndex::parse(region, name, config.eocd_window).await?;
        let Some(entry) = index.entry(segment) else {
            return Ok(None);
        };
        if entry.method != CompressionMethod::Stored {
            return Err(Error::UnsupportedNestedAccess(entry.full_name()));
        }
        region = entry.data.clone();
        name = entry.full_name();
    }

    let index = ArchiveIndex::parse(region, name, config.eocd_window).await?;
    match index.entry(leaf) {
        Some(entry) => Ok(Some(read_entry(entry).await?)),
        None => Ok(None),
    }
}
