//! The render-pipeline seam.
//!
//! The orchestrator never inspects what a pipeline does; it only knows that
//! building one is expensive (template-environment compilation, filter and
//! function registration, parser setup) and that rendering a page through
//! an existing one is cheap. [`PipelineFactory`] is how the real build
//! pipeline plugs in.

use std::sync::Arc;

use strata_scheduler::RenderableUnit;

/// Incremental-build dependency tracker.
///
/// Passed through to pipelines unread and unmodified: the orchestrator
/// forwards the handle in [`PipelineContext`], and only the concrete
/// pipeline implementation knows what to do with it.
pub trait DependencyTracker: Send + Sync {}

/// Context handed to [`PipelineFactory::build`].
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    /// The build generation this pipeline will be tagged with.
    pub generation: u64,
    /// Dependency tracker for the current pass, if any.
    pub tracker: Option<&'a Arc<dyn DependencyTracker>>,
}

/// Error from pipeline construction or a single page render.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The pipeline could not be constructed. Fails only the unit whose
    /// render triggered construction; the next unit on the same thread
    /// retries.
    #[error("pipeline construction failed: {0}")]
    Construction(String),

    /// A single page failed to render.
    #[error("{0}")]
    Render(String),

    /// The host is tearing down mid-pass (e.g. a watch loop exiting while
    /// writer threads flush). Benign: logged at debug and never aggregated.
    #[error("render interrupted by shutdown")]
    Shutdown,
}

impl PipelineError {
    /// Whether this error is a benign shutdown signal rather than a real
    /// render failure.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// An expensive-to-construct, cheap-to-reuse render pipeline.
pub trait Pipeline: Send + Sync {
    /// Parse, template, and write one page.
    fn process_page(&self, unit: &dyn RenderableUnit) -> Result<(), PipelineError>;
}

/// Factory for [`Pipeline`]s, called once per worker thread per generation.
pub trait PipelineFactory: Send + Sync {
    /// The pipeline type this factory builds.
    type Pipeline: Pipeline + 'static;

    /// Build a fresh pipeline for the given generation.
    fn build(&self, ctx: &PipelineContext<'_>) -> Result<Self::Pipeline, PipelineError>;
}
