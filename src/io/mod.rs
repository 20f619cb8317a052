mod http;
mod local;
mod region;

pub use http::HttpRangeSource;
pub use local::{FileSource, open_shared};
pub use region::Region;

use async_trait::async_trait;

/// Trait for random access reading from a backing store.
///
/// Implementations must make each `read_at` call atomic with respect to
/// other reads on the same handle: a store with a single seek cursor has to
/// serialize the seek-then-read pair internally so interleaved reads from
/// different [`Region`]s never corrupt each other's position.
#[async_trait]
pub trait RandomAccess: Send + Sync {
    /// Read data at the specified offset into the buffer, returning the
    /// number of bytes read. A short read signals end-of-stream, never
    /// buffering.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Total size of the backing store in bytes.
    fn size(&self) -> u64;
}
