//! Content-complexity estimation and page scheduling for Strata.
//!
//! This crate decides *in what order* a batch of pages should be handed to
//! render workers:
//! - [`estimate`]: scores a page by a fast content heuristic
//! - [`sort_by_complexity`]: orders a batch heaviest-first (LPT)
//! - [`ScheduleStats`]: diagnostic distribution statistics for a batch
//!
//! Scores only need to be *relatively* accurate: a page with many fenced code
//! blocks costs far more to render than plain prose, and dispatching it first
//! keeps workers evenly loaded.
//!
//! # Quick Start
//!
//! ```
//! use strata_scheduler::{ScheduleOrder, SourcePage, sort_by_complexity};
//!
//! let pages = vec![
//!     SourcePage::new("intro", "Just prose."),
//!     SourcePage::new("api", "```rust\nfn main() {}\n```\n"),
//! ];
//!
//! let ordered = sort_by_complexity(&pages, ScheduleOrder::Descending);
//! assert_eq!(ordered[0].path(), "api");
//! ```

mod complexity;
mod schedule;
mod unit;

pub use complexity::{ComplexityScore, estimate, estimate_opt};
pub use schedule::{ScheduleOrder, ScheduleStats, ScoreSample, should_schedule, sort_by_complexity};
pub use unit::{RenderableUnit, SourcePage};
