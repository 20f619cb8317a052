//! Nested-archive resolution.
//!
//! A "fat" package may contain Stored sub-packages, each of which may
//! contain further sub-packages. This module flattens that tree into a
//! single lookup table so callers can ask for an entry by its plain name
//! without knowing how deep it lives, and parses explicit `!/`-separated
//! addresses for callers that do know.

mod address;
mod cache;
mod resolver;

pub use address::{Address, normalize};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::io::{HttpRangeSource, RandomAccess, Region, open_shared};
use crate::zip::ZipEntry;
use cache::EntryCache;

const FILE_SCHEME: &str = "file:";

/// Tuning knobs for a [`NestedResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Entries whose name ends with this suffix and whose method is Stored
    /// are traversed as nested archives.
    pub container_suffix: String,
    /// How long the flattened index survives without lookups before it is
    /// dropped and rebuilt on demand.
    pub idle_ttl: Duration,
    /// Initial tail window for the EOCD scan.
    pub eocd_window: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            container_suffix: ".jar".to_string(),
            idle_ttl: Duration::from_secs(300),
            eocd_window: 256,
        }
    }
}

/// Resolves entries out of a nested archive by plain name.
///
/// The flattened index is built lazily on the first lookup, shared across
/// concurrent callers, and evicted after the configured idle interval to
/// bound memory. `resolve` is the byte-provider capability a host module
/// system consumes: absence is `Ok(None)`, every failure mode is a distinct
/// [`Error`].
pub struct NestedResolver {
    source: Region,
    name: String,
    config: ResolverConfig,
    cache: Arc<EntryCache>,
}

impl NestedResolver {
    /// Open a local archive with default configuration, reusing an
    /// already-open handle for the same file if one is live.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ResolverConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: ResolverConfig) -> Result<Self> {
        let path = path.as_ref();
        let source = open_shared(path)?;
        let name = path.to_string_lossy().into_owned();
        Ok(Self::from_source(source, name, config))
    }

    /// Build a resolver over any random-access store. `name` becomes the
    /// root of every canonical entry name.
    pub fn from_source(
        source: Arc<dyn RandomAccess>,
        name: impl Into<String>,
        config: ResolverConfig,
    ) -> Self {
        let cache = EntryCache::new(config.idle_ttl);
        Self {
            source: Region::new(source),
            name: name.into(),
            config,
            cache,
        }
    }

    /// Resolve an entry by archive-relative name, e.g. `com/x/Y.class`.
    ///
    /// Returns the decompressed bytes, or `None` if no entry of that name
    /// exists at any nesting level. When the same name exists at several
    /// levels the outermost (first seen in traversal order) wins.
    pub async fn resolve(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let index = self.flattened().await?;
        match index.get(name) {
            Some(entry) => Ok(Some(resolver::read_entry(entry).await?)),
            None => Ok(None),
        }
    }

    /// All reachable entries, sorted by canonical name.
    pub async fn entries(&self) -> Result<Vec<ZipEntry>> {
        let index = self.flattened().await?;
        let mut entries: Vec<ZipEntry> = index.values().cloned().collect();
        entries.sort_by_key(ZipEntry::full_name);
        Ok(entries)
    }

    /// How many times the flattened index has been built. Grows past one
    /// only when idle expiry forced a rebuild.
    pub fn build_count(&self) -> u64 {
        self.cache.build_count()
    }

    async fn flattened(&self) -> Result<Arc<resolver::FlattenedIndex>> {
        let source = self.source.clone();
        let name = self.name.clone();
        let config = &self.config;
        EntryCache::get_or_build(&self.cache, || {
            resolver::build_flattened(source, name, config)
        })
        .await
    }
}

/// Resolve an explicit nested address such as
/// `jar:file:/opt/app.jar!/lib/inner.jar!/com/x/Y.class`.
///
/// Unlike [`NestedResolver::resolve`] this descends exactly the named path
/// instead of consulting a flattened index, so it needs no cache and
/// reports `UnsupportedNestedAccess` when the path crosses a Deflated
/// container.
pub async fn resolve_address(spec: &str, config: &ResolverConfig) -> Result<Option<Vec<u8>>> {
    let address = Address::parse(spec)?;
    if address.segments.is_empty() {
        return Err(Error::InvalidAddress(
            spec.to_string(),
            "address names no entry (missing '!/' segment)".to_string(),
        ));
    }
    let source = open_root(&address.root).await?;
    resolver::descend(
        Region::new(source),
        address.root.clone(),
        &address.segments,
        config,
    )
    .await
}

/// Open the outermost archive named by a root locator: an `http(s)://`
/// URL, a `file:` URL, or a bare filesystem path.
pub async fn open_root(root: &str) -> Result<Arc<dyn RandomAccess>> {
    if root.starts_with("http://") || root.starts_with("https://") {
        let source = HttpRangeSource::connect(root.to_string()).await?;
        Ok(Arc::new(source))
    } else {
        let path = root.strip_prefix(FILE_SCHEME).unwrap_or(root);
        Ok(open_shared(Path::new(path))?)
    }
}
