//! Worker-pool sizing policy.

use crate::orchestrator::ProcessError;

/// How to size the render worker pool for a pass.
#[derive(Clone, Copy, Debug)]
pub struct WorkerPolicy {
    /// Hard ceiling on worker threads. Must be at least 1.
    pub max_workers: usize,
    /// Batches smaller than this render sequentially even when parallel
    /// dispatch was requested: pool setup overhead would dominate.
    /// Must be at least 1.
    pub min_units_for_parallel: usize,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            max_workers: 8,
            min_units_for_parallel: 4,
        }
    }
}

impl WorkerPolicy {
    /// Check the policy for caller bugs.
    ///
    /// An invalid policy fails the whole pass immediately (it is not a
    /// per-unit condition, so it is not aggregated).
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.max_workers == 0 {
            return Err(ProcessError::Configuration(
                "max_workers must be at least 1".to_owned(),
            ));
        }
        if self.min_units_for_parallel == 0 {
            return Err(ProcessError::Configuration(
                "min_units_for_parallel must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Worker count for a batch: bounded by the unit count and the ceiling,
    /// never less than one.
    #[must_use]
    pub fn resolve_workers(&self, unit_count: usize) -> usize {
        self.max_workers.min(unit_count).max(1)
    }
}

/// Whether this target can execute render workers truly in parallel.
///
/// On targets without real threads the orchestrator silently falls back to
/// sequential dispatch instead of paying pool overhead for no speedup.
#[must_use]
pub fn supports_true_parallelism() -> bool {
    cfg!(not(target_family = "wasm"))
}
