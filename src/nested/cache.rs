use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::nested::resolver::FlattenedIndex;

/// Lazily built, idle-expiring slot for one resolver's flattened index.
///
/// State machine: `Empty -> Building -> Ready -> (idle timeout) -> Empty`.
/// The first lookup on an empty slot builds the index while holding the
/// slot lock, so concurrent cold lookups block on that one build and all
/// observe the same result. Publication replaces the `Arc` rather than
/// mutating the table, so a lookup that already grabbed a reference keeps
/// using it safely after eviction.
pub(crate) struct EntryCache {
    slot: Mutex<Slot>,
    idle_ttl: Duration,
    builds: AtomicU64,
}

struct Slot {
    index: Option<Arc<FlattenedIndex>>,
    /// Bumped on every publish so a stale expiry task cannot evict a newer
    /// build.
    generation: u64,
    last_used: Instant,
}

impl EntryCache {
    pub(crate) fn new(idle_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                index: None,
                generation: 0,
                last_used: Instant::now(),
            }),
            idle_ttl,
            builds: AtomicU64::new(0),
        })
    }

    /// Return the current index, building it first if the slot is empty.
    pub(crate) async fn get_or_build<F, Fut>(
        cache: &Arc<EntryCache>,
        build: F,
    ) -> Result<Arc<FlattenedIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FlattenedIndex>>,
    {
        let mut slot = cache.slot.lock().await;
        slot.last_used = Instant::now();
        if let Some(index) = &slot.index {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(build().await?);
        cache.builds.fetch_add(1, Ordering::Relaxed);
        slot.index = Some(Arc::clone(&index));
        slot.generation += 1;
        slot.last_used = Instant::now();
        let generation = slot.generation;
        drop(slot);

        tokio::spawn(expire_after_idle(Arc::clone(cache), generation));
        Ok(index)
    }

    /// Number of index builds so far. Rebuilds after expiry count again.
    pub(crate) fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

/// Evict the slot once no lookup has touched it for a full idle interval.
/// Each wake-up either finds the slot genuinely idle or re-arms for the
/// remainder.
async fn expire_after_idle(cache: Arc<EntryCache>, generation: u64) {
    let mut wait = cache.idle_ttl;
    loop {
        tokio::time::sleep(wait).await;

        let mut slot = cache.slot.lock().await;
        if slot.generation != generation || slot.index.is_none() {
            // A newer build owns the slot now, or it was already cleared.
            return;
        }
        let idle = slot.last_used.elapsed();
        if idle >= cache.idle_ttl {
            slot.index = None;
            debug!(generation, "flattened index expired after idle interval");
            return;
        }
        wait = cache.idle_ttl - idle;
    }
}
