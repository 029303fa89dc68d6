//! Throttled progress reporting.
//!
//! Progress callbacks can be expensive (terminal redraws, IPC to an
//! editor). Firing one per unit on a ten-thousand-page site turns the
//! reporter into a bottleneck, so updates are batched: one every K units
//! or every T elapsed, whichever comes first. The completion tick is
//! always delivered.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Receives phase progress from the orchestrator.
///
/// Calls arrive in completion order, which is *not* submission order under
/// parallel dispatch: do not assume `item` values follow the scheduled
/// sequence.
pub trait ProgressReporter: Send + Sync {
    /// Report progress within a phase.
    ///
    /// # Arguments
    /// * `phase` - Phase name (e.g. "render")
    /// * `current` - Units completed so far
    /// * `total` - Units in the batch
    /// * `item` - Identity of the most recently completed unit
    /// * `threads` - Worker threads in use (1 for sequential)
    fn update_phase(&self, phase: &str, current: usize, total: usize, item: &str, threads: usize);
}

/// Reporter that discards all updates.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn update_phase(
        &self,
        _phase: &str,
        _current: usize,
        _total: usize,
        _item: &str,
        _threads: usize,
    ) {
    }
}

struct ThrottleState {
    last_at: Instant,
    last_count: usize,
}

/// Rate limiter for progress updates.
pub struct ProgressThrottle {
    every_units: usize,
    interval: Duration,
    state: Mutex<ThrottleState>,
}

impl ProgressThrottle {
    /// Create a throttle emitting every `every_units` completions or every
    /// `interval`, whichever comes first.
    ///
    /// `every_units` of zero behaves as one (every completion emits).
    #[must_use]
    pub fn new(every_units: usize, interval: Duration) -> Self {
        Self {
            every_units: every_units.max(1),
            interval,
            state: Mutex::new(ThrottleState {
                last_at: Instant::now(),
                last_count: 0,
            }),
        }
    }

    /// Whether an update for `current` of `total` should be emitted now.
    ///
    /// The final update (`current >= total`) is always emitted so consumers
    /// see the bar reach 100%.
    pub fn should_emit(&self, current: usize, total: usize) -> bool {
        if current >= total {
            return true;
        }

        let mut state = self.lock();
        if current.saturating_sub(state.last_count) >= self.every_units
            || state.last_at.elapsed() >= self.interval
        {
            state.last_count = current;
            state.last_at = Instant::now();
            return true;
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
