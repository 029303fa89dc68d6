//! The renderable-unit seam.
//!
//! The scheduler does not own pages; it only needs read access to their
//! content and a memoized score slot. [`RenderableUnit`] expresses exactly
//! that, and [`SourcePage`] is the standard in-memory implementation used
//! by the build pipeline.

use std::sync::OnceLock;

use crate::complexity::{ComplexityScore, estimate_opt};

/// A unit of content that can be scheduled for rendering.
///
/// Implementors provide a stable identity (used in logs and failure
/// reports), optional content, and a private score slot. The slot makes
/// repeated scoring free: sorting and later statistics logging never scan
/// the same content twice.
///
/// The slot is an [`OnceLock`], so a redundant racing write from two
/// threads is idempotent (scoring is pure) and the slot is never corrupted.
pub trait RenderableUnit {
    /// Stable identity for logs and failure reports (typically the source
    /// path).
    fn identity(&self) -> &str;

    /// Raw content, if loaded. Absent content scores zero.
    fn content(&self) -> Option<&str>;

    /// Memoized score slot, written at most once per unit.
    fn score_slot(&self) -> &OnceLock<ComplexityScore>;

    /// Complexity of this unit, estimated on first access and cached.
    fn complexity(&self) -> ComplexityScore {
        *self
            .score_slot()
            .get_or_init(|| estimate_opt(self.content()))
    }
}

/// An in-memory page backed by its markdown source.
#[derive(Debug, Default)]
pub struct SourcePage {
    path: String,
    content: Option<String>,
    score: OnceLock<ComplexityScore>,
}

impl SourcePage {
    /// Create a page with loaded content.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            score: OnceLock::new(),
        }
    }

    /// Create a page whose content has not been loaded.
    ///
    /// Such pages score zero and sort last under descending order.
    #[must_use]
    pub fn without_content(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            score: OnceLock::new(),
        }
    }

    /// Source path of this page.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl RenderableUnit for SourcePage {
    fn identity(&self) -> &str {
        &self.path
    }

    fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    fn score_slot(&self) -> &OnceLock<ComplexityScore> {
        &self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_is_memoized() {
        let page = SourcePage::new("guide", "```\nx\n```\n");
        assert!(page.score_slot().get().is_none());

        let first = page.complexity();
        assert_eq!(page.score_slot().get(), Some(&first));

        // Second access reads the slot, not the content.
        assert_eq!(page.complexity(), first);
    }

    #[test]
    fn test_page_without_content_scores_zero() {
        let page = SourcePage::without_content("lazy");
        assert_eq!(page.complexity().score, 0);
    }

    #[test]
    fn test_identity_is_path() {
        let page = SourcePage::new("domain/guide", "text");
        assert_eq!(page.identity(), "domain/guide");
        assert_eq!(page.path(), "domain/guide");
    }
}
