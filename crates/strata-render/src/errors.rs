//! Batched failure reporting.
//!
//! A large site can fail the same way hundreds of times (a broken shared
//! include, an unreachable diagram server). Logging every instance drowns
//! the useful signal, so the aggregator logs the first few *distinct*
//! failures individually and rolls everything else into one summary line.

use std::collections::HashSet;

use crate::pipeline::PipelineError;

/// Individually logged failures before the rest collapse into the summary.
const MAX_SAMPLES: usize = 5;

/// One recorded per-unit failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderFailure {
    /// Identity of the failed unit.
    pub unit: String,
    /// Error display text.
    pub message: String,
}

/// Collects per-unit render failures for one pass.
///
/// A unit's failure is never fatal to the batch: it is recorded here and
/// the pass carries on. "Completed with N failures" is a valid terminal
/// state; whether that should abort the overall build is the caller's
/// decision.
#[derive(Debug)]
pub struct ErrorAggregator {
    total_items: usize,
    max_samples: usize,
    samples: Vec<RenderFailure>,
    seen: HashSet<String>,
    unsampled: usize,
}

impl ErrorAggregator {
    /// Create an aggregator for a pass over `total_items` units.
    #[must_use]
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            max_samples: MAX_SAMPLES,
            samples: Vec::new(),
            seen: HashSet::new(),
            unsampled: 0,
        }
    }

    /// Override the individual-log sample budget.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Record one unit's failure.
    ///
    /// The first [`MAX_SAMPLES`] distinct errors (by display text) are
    /// logged individually at warn; repeats and overflow only count toward
    /// the summary.
    pub fn record(&mut self, unit: &str, error: &PipelineError) {
        let message = error.to_string();
        let distinct = self.seen.insert(message.clone());

        if distinct && self.samples.len() < self.max_samples {
            tracing::warn!(unit, error = %message, "Page render failed");
            self.samples.push(RenderFailure {
                unit: unit.to_owned(),
                message,
            });
        } else {
            self.unsampled += 1;
        }
    }

    /// Total failures recorded, sampled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len() + self.unsampled
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.unsampled == 0
    }

    /// The individually sampled failures.
    #[must_use]
    pub fn samples(&self) -> &[RenderFailure] {
        &self.samples
    }

    /// Emit the single summary line for this pass, if anything failed.
    pub fn log_summary(&self, phase: &str) {
        if self.is_empty() {
            return;
        }
        tracing::warn!(
            phase,
            failed = self.len(),
            total = self.total_items,
            sampled = self.samples.len(),
            "Completed with render failures"
        );
    }
}
