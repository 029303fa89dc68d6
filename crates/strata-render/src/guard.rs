//! Active-render reference counting.
//!
//! Flags whether any render pass is in flight so that cache invalidation
//! triggered mid-pass can be warned about. Deliberately does *not* enforce
//! mutual exclusion: blocking a generation bump on in-flight renders would
//! deadlock watch-mode rebuilds fired while a previous pass is still
//! flushing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared count of in-flight render passes.
///
/// Wraps the raw integer: the only mutations are the increment in
/// [`enter`](Self::enter) and the decrement in [`ActivePass::drop`], so the
/// count can never go negative or leak an increment across an early return
/// or panic.
#[derive(Debug, Default)]
pub struct ActiveRenderCount {
    count: Mutex<usize>,
}

impl ActiveRenderCount {
    /// Create a counter with no active passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pass as active until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> ActivePass {
        *self.lock() += 1;
        ActivePass {
            counter: Arc::clone(self),
        }
    }

    /// Number of passes currently in flight.
    #[must_use]
    pub fn active(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII guard for one in-flight render pass.
///
/// Dropping it decrements the count on every exit path, including unwinds.
#[must_use = "the pass is marked inactive as soon as the guard is dropped"]
pub struct ActivePass {
    counter: Arc<ActiveRenderCount>,
}

impl Drop for ActivePass {
    fn drop(&mut self) {
        let mut count = self.counter.lock();
        *count = count.saturating_sub(1);
    }
}
