//! Cache-invalidation registry for Strata.
//!
//! Build components own caches of very different shapes (thread-cached
//! render pipelines, rendered-page stores, diagram caches). What they share
//! is *when* those caches must be dropped. [`CacheRegistry`] decouples the
//! two: each component registers a clear function together with the
//! [`InvalidationReason`]s it cares about, and whoever observes an event
//! fans it out with [`CacheRegistry::invalidate_for_reason`] without knowing
//! who is listening.
//!
//! # Example
//!
//! ```
//! use strata_cache::{CacheRegistry, InvalidationReason};
//!
//! let registry = CacheRegistry::new();
//! registry.register("pages", &[InvalidationReason::FullRebuild], || {
//!     // drop rendered-page cache here
//! });
//!
//! let cleared = registry.invalidate_for_reason(InvalidationReason::FullRebuild);
//! assert_eq!(cleared, 1);
//! ```

use std::sync::Mutex;

/// Why a cache is being invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// Template sources changed; anything derived from templates is stale.
    TemplateChange,
    /// A full rebuild was requested; all derived state is stale.
    FullRebuild,
    /// A new build pass is starting.
    BuildStart,
    /// Test teardown between cases.
    TestCleanup,
}

impl InvalidationReason {
    /// Stable name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemplateChange => "template-change",
            Self::FullRebuild => "full-rebuild",
            Self::BuildStart => "build-start",
            Self::TestCleanup => "test-cleanup",
        }
    }
}

struct Registration {
    name: String,
    reasons: Vec<InvalidationReason>,
    clear: Box<dyn Fn() + Send + Sync>,
}

/// Registry of cache clear functions keyed by invalidation reason.
///
/// Clear functions must be cheap and must not re-enter the registry.
#[derive(Default)]
pub struct CacheRegistry {
    entries: Mutex<Vec<Registration>>,
}

impl CacheRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named cache with the reasons that invalidate it.
    ///
    /// Registering the same name twice keeps both entries; both clear
    /// functions run when a matching reason fires.
    pub fn register(
        &self,
        name: impl Into<String>,
        reasons: &[InvalidationReason],
        clear: impl Fn() + Send + Sync + 'static,
    ) {
        let entry = Registration {
            name: name.into(),
            reasons: reasons.to_vec(),
            clear: Box::new(clear),
        };
        self.lock().push(entry);
    }

    /// Run every clear function registered for `reason`.
    ///
    /// Returns the number of caches cleared.
    pub fn invalidate_for_reason(&self, reason: InvalidationReason) -> usize {
        let entries = self.lock();
        let mut cleared = 0;
        for entry in entries.iter() {
            if entry.reasons.contains(&reason) {
                tracing::debug!(cache = %entry.name, reason = reason.as_str(), "Clearing cache");
                (entry.clear)();
                cleared += 1;
            }
        }
        cleared
    }

    /// Number of registered caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry has no registered caches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        // A clear function that panicked leaves the list itself intact.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
