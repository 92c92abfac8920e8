//! Single-flight content cache.
//!
//! Maps normalized paths to resolved [`Content`] snapshots. Concurrent first
//! opens of the same path share one resolution: the first caller runs it and
//! the rest wait on the same cell. Failed resolutions are not cached.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::content::Content;
use crate::error::GenResult;

type Slot = Arc<OnceCell<Arc<Content>>>;

/// Path-keyed content cache.
#[derive(Debug, Default)]
pub struct ContentCache {
    slots: DashMap<String, Slot>,
}

impl ContentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached snapshot for `path`, resolving it with `init` on a
    /// miss. Only one `init` runs per path at a time.
    pub async fn get_or_try_init<F, Fut>(&self, path: &str, init: F) -> GenResult<Arc<Content>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GenResult<Content>>,
    {
        // Clone the slot out so no map guard is held across the await.
        let slot: Slot = self.slots.entry(path.to_string()).or_default().clone();

        let result = slot
            .get_or_try_init(move || async move { init().await.map(Arc::new) })
            .await
            .cloned();

        if result.is_err() {
            self.slots
                .remove_if(path, |_, s| Arc::ptr_eq(s, &slot) && !s.initialized());
        }
        result
    }

    /// Cached snapshot for `path`, if present.
    pub fn get(&self, path: &str) -> Option<Arc<Content>> {
        self.slots.get(path).and_then(|slot| slot.get().cloned())
    }

    /// Returns true if `path` has a cached snapshot.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Drop the snapshot for `path`. Returns true if one was cached.
    ///
    /// A resolution already in flight finishes for its waiters, but the
    /// next open starts over.
    pub fn evict(&self, path: &str) -> bool {
        self.slots
            .remove(path)
            .is_some_and(|(_, slot)| slot.initialized())
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every snapshot.
    pub fn clear(&self) {
        self.slots.clear();
    }
}
