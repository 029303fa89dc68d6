//! Top-level render pass coordination.
//!
//! One [`RenderOrchestrator::process`] call is one build pass:
//!
//! ```text
//! Idle -> GenerationBumped -> Active -> {Sequential | Parallel} -> Draining -> Idle
//! ```
//!
//! The generation is bumped on the calling thread strictly before any task
//! submission, so every worker's read of it is happens-after the bump. The
//! active-pass guard is RAII and is released on every exit path.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use strata_cache::{CacheRegistry, InvalidationReason};
use strata_scheduler::{
    RenderableUnit, ScheduleOrder, ScheduleStats, should_schedule, sort_by_complexity,
};

use crate::errors::{ErrorAggregator, RenderFailure};
use crate::generation::GenerationCounter;
use crate::guard::ActiveRenderCount;
use crate::pipeline::{DependencyTracker, Pipeline, PipelineContext, PipelineError, PipelineFactory};
use crate::progress::{ProgressReporter, ProgressThrottle};
use crate::thread_cache::PipelineCache;
use crate::workers::{WorkerPolicy, supports_true_parallelism};

/// Name under which the orchestrator registers its pipeline caches.
const PIPELINE_CACHE_NAME: &str = "render-pipelines";

/// Phase name reported to progress consumers and log lines.
const RENDER_PHASE: &str = "render";

/// Error that fails a whole `process` call.
///
/// Per-unit render failures are *not* here: they are aggregated into the
/// [`ProcessReport`] and never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The worker policy is invalid. A caller bug, so it fails fast
    /// instead of being aggregated.
    #[error("invalid worker policy: {0}")]
    Configuration(String),

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Tuning knobs for an orchestrator.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Worker-pool sizing policy.
    pub workers: WorkerPolicy,
    /// Emit a progress update at least every this many completed units.
    pub progress_every_units: usize,
    /// Emit a progress update whenever this much time has passed since the
    /// last one, even if fewer units completed.
    pub progress_interval: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            workers: WorkerPolicy::default(),
            progress_every_units: 25,
            progress_interval: Duration::from_millis(200),
        }
    }
}

/// Effects summary for one `process` call.
///
/// "Completed with failures" is a valid terminal state: `failed` counts
/// units whose render errored, and whether that aborts the overall build
/// (strict mode) is decided by the layer above.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Units in the batch.
    pub total: usize,
    /// Units rendered successfully.
    pub rendered: usize,
    /// Units whose render failed.
    pub failed: usize,
    /// Units skipped because a shutdown signal surfaced mid-pass.
    pub shutdown_interrupts: usize,
    /// Worker threads used (1 for sequential dispatch).
    pub workers: usize,
    /// Score-distribution statistics, when LPT ordering was applied.
    pub stats: Option<ScheduleStats>,
    /// The individually sampled failures (bounded; see `failed` for the
    /// full count).
    pub failures: Vec<RenderFailure>,
    /// Time spent scoring and ordering the batch.
    pub schedule_time: Duration,
    /// Time spent rendering.
    pub render_time: Duration,
    /// Wall-clock time for the whole pass.
    pub total_time: Duration,
}

/// Coordinates complexity scheduling, per-thread pipeline caching, and
/// worker dispatch for render passes.
pub struct RenderOrchestrator<F: PipelineFactory> {
    factory: F,
    options: RenderOptions,
    generation: Arc<GenerationCounter>,
    active: Arc<ActiveRenderCount>,
    pipelines: Arc<PipelineCache<F::Pipeline>>,
    registry: Option<Arc<CacheRegistry>>,
}

impl<F: PipelineFactory> RenderOrchestrator<F> {
    /// Create an orchestrator around a pipeline factory.
    #[must_use]
    pub fn new(factory: F, options: RenderOptions) -> Self {
        Self {
            factory,
            options,
            generation: Arc::new(GenerationCounter::new()),
            active: Arc::new(ActiveRenderCount::new()),
            pipelines: Arc::new(PipelineCache::new()),
            registry: None,
        }
    }

    /// Attach a cache registry.
    ///
    /// Registers the pipeline caches under template-change, full-rebuild,
    /// and test-cleanup (clearing them means bumping the generation), and
    /// makes every pass fan out a build-start invalidation to the *other*
    /// registered caches. The orchestrator's own entry deliberately does
    /// not listen for build-start.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<CacheRegistry>) -> Self {
        let generation = Arc::clone(&self.generation);
        let active = Arc::clone(&self.active);
        let pipelines = Arc::clone(&self.pipelines);
        registry.register(
            PIPELINE_CACHE_NAME,
            &[
                InvalidationReason::TemplateChange,
                InvalidationReason::FullRebuild,
                InvalidationReason::TestCleanup,
            ],
            move || {
                let generation = generation.bump_with_activity_check(&active);
                pipelines.clear();
                tracing::debug!(generation, "Thread pipeline caches invalidated");
            },
        );
        self.registry = Some(registry);
        self
    }

    /// Render a batch of units.
    ///
    /// Exactly one generation bump per call, before the pass goes active.
    /// Parallel dispatch is used when requested *and* worth it: enough
    /// units, more than one worker, and a target with real threads.
    /// Per-unit failures are aggregated into the report; only a broken
    /// configuration fails the call itself.
    ///
    /// # Errors
    ///
    /// [`ProcessError::Configuration`] for an invalid worker policy,
    /// [`ProcessError::WorkerPool`] when the thread pool cannot be built.
    pub fn process<U>(
        &self,
        units: &[U],
        parallel: bool,
        tracker: Option<&Arc<dyn DependencyTracker>>,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessReport, ProcessError>
    where
        U: RenderableUnit + Sync,
    {
        self.options.workers.validate()?;

        let pass_started = Instant::now();
        let generation = self.generation.bump_with_activity_check(&self.active);
        if let Some(registry) = &self.registry {
            registry.invalidate_for_reason(InvalidationReason::BuildStart);
        }

        let pass = self.active.enter();
        let mut report = self.dispatch(units, parallel, generation, tracker, progress)?;
        drop(pass);

        report.total_time = pass_started.elapsed();
        tracing::info!(
            generation,
            total = report.total,
            rendered = report.rendered,
            failed = report.failed,
            workers = report.workers,
            elapsed_ms = report.total_time.as_millis() as u64,
            "Render pass finished"
        );
        Ok(report)
    }

    /// Invalidate every thread's cached pipeline by bumping the generation.
    ///
    /// Public hook for external watch loops between passes.
    pub fn clear_thread_pipelines(&self) {
        let generation = self.generation.bump_with_activity_check(&self.active);
        self.pipelines.clear();
        tracing::debug!(generation, "Thread pipeline caches invalidated");
    }

    /// The current build generation.
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.current()
    }

    /// Render passes currently in flight. Debug and test introspection
    /// only.
    #[must_use]
    pub fn active_render_count(&self) -> usize {
        self.active.active()
    }

    fn dispatch<U>(
        &self,
        units: &[U],
        parallel: bool,
        generation: u64,
        tracker: Option<&Arc<dyn DependencyTracker>>,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessReport, ProcessError>
    where
        U: RenderableUnit + Sync,
    {
        let worker_count = self.options.workers.resolve_workers(units.len());
        let use_parallel = parallel
            && supports_true_parallelism()
            && worker_count > 1
            && units.len() >= self.options.workers.min_units_for_parallel;

        let mut report = ProcessReport {
            total: units.len(),
            workers: if use_parallel { worker_count } else { 1 },
            ..ProcessReport::default()
        };

        let schedule_started = Instant::now();
        let ordered: Vec<&U> = if use_parallel && should_schedule(units.len(), worker_count) {
            let ordered = sort_by_complexity(units, ScheduleOrder::Descending);
            let stats = ScheduleStats::compute(units);
            tracing::debug!(
                count = stats.count,
                max = stats.max,
                variance_ratio = stats.variance_ratio,
                skewed = stats.is_skewed(),
                "Ordered batch heaviest-first"
            );
            report.stats = Some(stats);
            ordered
        } else {
            units.iter().collect()
        };
        report.schedule_time = schedule_started.elapsed();

        let throttle = ProgressThrottle::new(
            self.options.progress_every_units,
            self.options.progress_interval,
        );
        let mut aggregator = ErrorAggregator::new(units.len());

        let render_started = Instant::now();
        if use_parallel {
            self.dispatch_parallel(
                &ordered,
                generation,
                worker_count,
                tracker,
                progress,
                &throttle,
                &mut aggregator,
                &mut report,
            )?;
        } else {
            self.dispatch_sequential(
                &ordered,
                generation,
                tracker,
                progress,
                &throttle,
                &mut aggregator,
                &mut report,
            );
        }
        report.render_time = render_started.elapsed();

        aggregator.log_summary(RENDER_PHASE);
        report.failed = aggregator.len();
        report.failures = aggregator.samples().to_vec();
        Ok(report)
    }

    /// Plain loop on the calling thread.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_sequential<U>(
        &self,
        ordered: &[&U],
        generation: u64,
        tracker: Option<&Arc<dyn DependencyTracker>>,
        progress: &dyn ProgressReporter,
        throttle: &ProgressThrottle,
        aggregator: &mut ErrorAggregator,
        report: &mut ProcessReport,
    ) where
        U: RenderableUnit + Sync,
    {
        for (done, unit) in ordered.iter().enumerate() {
            let outcome = self.render_one(*unit, generation, tracker);
            record_outcome(report, aggregator, unit.identity(), outcome);

            let current = done + 1;
            if throttle.should_emit(current, ordered.len()) {
                progress.update_phase(RENDER_PHASE, current, ordered.len(), unit.identity(), 1);
            }
        }
    }

    /// One task per unit on a fixed-size pool, drained in completion order.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_parallel<U>(
        &self,
        ordered: &[&U],
        generation: u64,
        worker_count: usize,
        tracker: Option<&Arc<dyn DependencyTracker>>,
        progress: &dyn ProgressReporter,
        throttle: &ProgressThrottle,
        aggregator: &mut ErrorAggregator,
        report: &mut ProcessReport,
    ) -> Result<(), ProcessError>
    where
        U: RenderableUnit + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("strata-render-{i}"))
            .build()
            .map_err(|e| ProcessError::WorkerPool(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<(usize, Result<(), PipelineError>)>();

        // Submission order is the post-scheduling order; the calling thread
        // drains results as they complete, which is explicitly unordered
        // relative to submission.
        pool.in_place_scope(|scope| {
            for (index, unit) in ordered.iter().enumerate() {
                let tx = tx.clone();
                let unit: &U = unit;
                scope.spawn(move |_| {
                    let outcome = self.render_one(unit, generation, tracker);
                    // The drain loop owns the receiver until the scope ends;
                    // a send can only fail if it panicked, and the scope
                    // surfaces that panic anyway.
                    let _ = tx.send((index, outcome));
                });
            }
            drop(tx);

            let mut done = 0;
            for (index, outcome) in rx {
                done += 1;
                let unit = ordered[index];
                record_outcome(report, aggregator, unit.identity(), outcome);

                if throttle.should_emit(done, ordered.len()) {
                    progress.update_phase(
                        RENDER_PHASE,
                        done,
                        ordered.len(),
                        unit.identity(),
                        worker_count,
                    );
                }
            }
        });

        Ok(())
    }

    /// Render one unit through this thread's cached pipeline.
    ///
    /// The generation was captured once at dispatch start and is not
    /// re-read per unit, so a concurrent bump cannot tear one pass across
    /// two generations.
    fn render_one<U>(
        &self,
        unit: &U,
        generation: u64,
        tracker: Option<&Arc<dyn DependencyTracker>>,
    ) -> Result<(), PipelineError>
    where
        U: RenderableUnit,
    {
        let pipeline = self.pipelines.get_or_create(generation, || {
            self.factory.build(&PipelineContext { generation, tracker })
        })?;

        // A panicking pipeline fails this unit like any other render error
        // instead of tearing down the whole pass.
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pipeline.process_page(unit)))
            .unwrap_or_else(|panic| Err(PipelineError::Render(panic_message(&panic))))
    }
}

fn record_outcome(
    report: &mut ProcessReport,
    aggregator: &mut ErrorAggregator,
    unit_id: &str,
    outcome: Result<(), PipelineError>,
) {
    match outcome {
        Ok(()) => report.rendered += 1,
        Err(error) if error.is_shutdown() => {
            report.shutdown_interrupts += 1;
            tracing::debug!(unit = unit_id, "Render interrupted by shutdown; ignoring");
        }
        Err(error) => aggregator.record(unit_id, &error),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("render panicked: {text}")
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("render panicked: {text}")
    } else {
        "render panicked".to_owned()
    }
}
