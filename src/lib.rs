//! # zipnest
//!
//! A nested-archive resolution engine: locate, index, and serve byte ranges
//! for entries that live arbitrarily deep inside ZIP archives-within-archives,
//! without ever extracting the outer container to disk.
//!
//! A "fat" package holds uncompressed (Stored) sub-packages, each of which
//! may hold further sub-packages. The engine finds the end-of-central-
//! directory record of the outer archive, walks its central directory, and
//! recursively indexes every Stored container into one flattened lookup
//! table. Entries are read straight out of the backing store (a local file
//! or a remote file behind HTTP Range requests) and Deflated payloads are
//! decompressed on the fly.
//!
//! ## Example
//!
//! ```no_run
//! use zipnest::NestedResolver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // app.jar contains lib/inner.jar (Stored), which contains the class.
//!     let resolver = NestedResolver::open("app.jar")?;
//!
//!     if let Some(bytes) = resolver.resolve("com/x/Y.class").await? {
//!         println!("{} bytes", bytes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Entries can also be addressed explicitly through each nesting level:
//!
//! ```no_run
//! # use zipnest::{ResolverConfig, resolve_address};
//! # async fn demo() -> zipnest::Result<()> {
//! let bytes =
//!     resolve_address("jar:file:/opt/app.jar!/lib/inner.jar!/com/x/Y.class", &ResolverConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod nested;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{FileSource, HttpRangeSource, RandomAccess, Region};
pub use nested::{Address, NestedResolver, ResolverConfig, open_root, resolve_address};
pub use zip::{ArchiveIndex, CompressionMethod, EndOfCentralDirectory, ZipEntry, inflate_raw};
