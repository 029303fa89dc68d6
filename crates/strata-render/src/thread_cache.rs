//! Generation-tagged per-thread pipeline caching.
//!
//! Pipeline construction is expensive; rendering through an existing
//! pipeline is cheap. Each worker thread therefore keeps one pipeline and
//! reuses it for every unit it processes. But a pipeline built before a
//! template change must never survive into a new pass, so every entry is
//! tagged with the generation it was built for and rebuilt on mismatch.
//!
//! The store is an explicit map keyed by [`ThreadId`] rather than
//! language-level thread-local storage: ownership is visible at the type
//! level, and tests can observe the cache from the outside.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

struct Slot<P> {
    generation: u64,
    pipeline: Arc<P>,
}

/// Per-thread, generation-tagged pipeline store.
///
/// The map lock covers only lookup and insert. Construction runs outside
/// it: a thread only ever reads or writes its own key, so there is no
/// duplicate-build race to guard against, and a slow build never stalls
/// the other workers.
pub struct PipelineCache<P> {
    slots: Mutex<HashMap<ThreadId, Slot<P>>>,
}

impl<P> Default for PipelineCache<P> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<P> PipelineCache<P> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the calling thread's pipeline for `generation`.
    ///
    /// Returns the cached instance when this thread already holds one
    /// tagged with `generation`; otherwise calls `build` and caches the
    /// result. A failed build leaves the slot as it was (stale or empty),
    /// so the next unit rendered on this thread retries instead of seeing
    /// a permanently poisoned slot. The error propagates only to the unit
    /// whose render triggered construction.
    pub fn get_or_create<E>(
        &self,
        generation: u64,
        build: impl FnOnce() -> Result<P, E>,
    ) -> Result<Arc<P>, E> {
        let thread = thread::current().id();

        if let Some(slot) = self.lock().get(&thread)
            && slot.generation == generation
        {
            return Ok(Arc::clone(&slot.pipeline));
        }

        let pipeline = Arc::new(build()?);
        self.lock().insert(
            thread,
            Slot {
                generation,
                pipeline: Arc::clone(&pipeline),
            },
        );
        Ok(pipeline)
    }

    /// Drop every cached pipeline.
    ///
    /// Workers holding an `Arc` to an entry keep it alive until their
    /// current unit finishes; only the cache's reference is released.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of threads currently holding a cached pipeline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no thread holds a cached pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadId, Slot<P>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePipeline;

    #[test]
    fn test_same_generation_returns_same_instance() {
        let cache: PipelineCache<FakePipeline> = PipelineCache::new();

        let first = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();
        let second = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_new_generation_rebuilds() {
        let cache: PipelineCache<FakePipeline> = PipelineCache::new();

        let old = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();
        let new = cache.get_or_create(2, || Ok::<_, String>(FakePipeline)).unwrap();

        assert!(!Arc::ptr_eq(&old, &new));
        // The stale entry was replaced, not accumulated.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_build_failure_is_retried() {
        let cache: PipelineCache<FakePipeline> = PipelineCache::new();

        let failed: Result<Arc<FakePipeline>, String> =
            cache.get_or_create(1, || Err("templates unavailable".to_owned()));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        // Next access on the same thread retries and succeeds.
        let ok = cache.get_or_create(1, || Ok::<_, String>(FakePipeline));
        assert!(ok.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_build_failure_keeps_stale_entry() {
        let cache: PipelineCache<FakePipeline> = PipelineCache::new();

        let old = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();
        let failed: Result<Arc<FakePipeline>, String> =
            cache.get_or_create(2, || Err("transient".to_owned()));
        assert!(failed.is_err());

        // The generation-1 entry is still there; a retry at generation 1
        // reuses it.
        let again = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();
        assert!(Arc::ptr_eq(&old, &again));
    }

    #[test]
    fn test_each_thread_gets_its_own_entry() {
        let cache: Arc<PipelineCache<FakePipeline>> = Arc::new(PipelineCache::new());

        let local = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();

        let remote = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap()
            })
            .join()
            .unwrap()
        };

        assert!(!Arc::ptr_eq(&local, &remote));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_drops_entries() {
        let cache: PipelineCache<FakePipeline> = PipelineCache::new();
        let held = cache.get_or_create(1, || Ok::<_, String>(FakePipeline)).unwrap();

        cache.clear();
        assert!(cache.is_empty());

        // The caller's handle is unaffected.
        drop(held);
    }
}
