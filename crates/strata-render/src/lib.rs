//! Parallel render orchestration for Strata.
//!
//! This crate decides how a batch of pages is distributed across worker
//! threads and keeps per-thread render pipelines consistent across
//! incremental build passes:
//!
//! - [`RenderOrchestrator`]: top-level coordinator for one render pass
//! - [`GenerationCounter`]: process-wide build-pass counter used for cheap
//!   integer-compare cache invalidation
//! - [`PipelineCache`]: generation-tagged, thread-keyed pipeline store
//! - [`ActiveRenderCount`]: reference-counted in-flight-pass flag
//! - [`ErrorAggregator`]: batched per-unit failure reporting
//!
//! The actual markdown/template pipeline plugs in through
//! [`PipelineFactory`]; this crate never inspects what a pipeline does.
//!
//! # Quick Start
//!
//! ```
//! use strata_render::{
//!     NullProgress, Pipeline, PipelineContext, PipelineError, PipelineFactory,
//!     RenderOptions, RenderOrchestrator,
//! };
//! use strata_scheduler::{RenderableUnit, SourcePage};
//!
//! struct HtmlPipeline;
//!
//! impl Pipeline for HtmlPipeline {
//!     fn process_page(&self, _unit: &dyn RenderableUnit) -> Result<(), PipelineError> {
//!         // parse + template + write one page
//!         Ok(())
//!     }
//! }
//!
//! struct HtmlFactory;
//!
//! impl PipelineFactory for HtmlFactory {
//!     type Pipeline = HtmlPipeline;
//!
//!     fn build(&self, _ctx: &PipelineContext<'_>) -> Result<HtmlPipeline, PipelineError> {
//!         // expensive: template environment, filters, parser setup
//!         Ok(HtmlPipeline)
//!     }
//! }
//!
//! # fn main() -> Result<(), strata_render::ProcessError> {
//! let orchestrator = RenderOrchestrator::new(HtmlFactory, RenderOptions::default());
//! let pages = vec![SourcePage::new("guide", "# Guide\n\nBody.")];
//!
//! let report = orchestrator.process(&pages, true, None, &NullProgress)?;
//! assert_eq!(report.rendered, 1);
//! # Ok(())
//! # }
//! ```

mod errors;
mod generation;
mod guard;
mod orchestrator;
mod pipeline;
mod progress;
mod thread_cache;
mod workers;

pub use errors::{ErrorAggregator, RenderFailure};
pub use generation::GenerationCounter;
pub use guard::{ActivePass, ActiveRenderCount};
pub use orchestrator::{ProcessError, ProcessReport, RenderOptions, RenderOrchestrator};
pub use pipeline::{
    DependencyTracker, Pipeline, PipelineContext, PipelineError, PipelineFactory,
};
pub use progress::{NullProgress, ProgressReporter, ProgressThrottle};
pub use thread_cache::PipelineCache;
pub use workers::{WorkerPolicy, supports_true_parallelism};
