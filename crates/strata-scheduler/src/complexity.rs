//! Content-complexity heuristic.
//!
//! Scores markdown content with four independent single-pass scans, each
//! O(content length) with no backtracking. The weights are tuned so fenced
//! code blocks dominate: they are by far the most expensive elements to
//! render (syntax highlighting, line numbering).

use serde::{Deserialize, Serialize};

/// One point of score per this many bytes of raw content.
const BYTES_PER_POINT: usize = 500;
/// Weight per fenced code block.
const CODE_BLOCK_WEIGHT: u64 = 10;
/// Weight per MyST/RST directive opener.
const DIRECTIVE_WEIGHT: u64 = 3;
/// Weight per template-variable marker (`{{`).
const VARIABLE_WEIGHT: u64 = 1;

/// Complexity score for a unit of content.
///
/// Immutable once created. The derived `score` is a pure function of the
/// content; only relative ordering across pages is meaningful, not the
/// absolute value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    /// Raw content length in bytes.
    pub content_bytes: usize,
    /// Complete fenced code blocks (delimiter-line pairs).
    pub code_blocks: usize,
    /// MyST (`:::{name}`) and RST (`.. name::`) directive openers.
    pub directives: usize,
    /// Template-variable open markers (`{{`).
    pub variables: usize,
    /// Weighted sum used for scheduling.
    pub score: u64,
}

impl ComplexityScore {
    /// The all-zero score, used for empty or absent content.
    pub const ZERO: Self = Self {
        content_bytes: 0,
        code_blocks: 0,
        directives: 0,
        variables: 0,
        score: 0,
    };

    fn new(content_bytes: usize, code_blocks: usize, directives: usize, variables: usize) -> Self {
        let score = (content_bytes / BYTES_PER_POINT) as u64
            + code_blocks as u64 * CODE_BLOCK_WEIGHT
            + directives as u64 * DIRECTIVE_WEIGHT
            + variables as u64 * VARIABLE_WEIGHT;
        Self {
            content_bytes,
            code_blocks,
            directives,
            variables,
            score,
        }
    }
}

/// Count fenced-code-block delimiter lines and pair them up.
///
/// An odd (unclosed) trailing fence is silently undercounted by the floor
/// division. This quirk is kept intentionally: correcting it would change
/// the observable scheduling order of existing sites.
fn count_code_blocks(content: &str) -> usize {
    let fence_lines = content
        .lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count();
    fence_lines / 2
}

/// Count MyST-style (`:::{name}` / `:::name`) and RST-style (`.. name::`)
/// directive openers.
///
/// A bare `:::` line closes a MyST block and is not counted.
fn count_directives(content: &str) -> usize {
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix(":::") {
                !rest.trim().is_empty()
            } else if let Some(rest) = trimmed.strip_prefix(".. ") {
                rest.contains("::")
            } else {
                false
            }
        })
        .count()
}

/// Count template-variable open markers.
fn count_variables(content: &str) -> usize {
    content.matches("{{").count()
}

/// Estimate the render complexity of a piece of content.
///
/// Empty content yields [`ComplexityScore::ZERO`]. Never fails; the scans
/// are byte-oriented and tolerate arbitrary input.
#[must_use]
pub fn estimate(content: &str) -> ComplexityScore {
    if content.is_empty() {
        return ComplexityScore::ZERO;
    }
    ComplexityScore::new(
        content.len(),
        count_code_blocks(content),
        count_directives(content),
        count_variables(content),
    )
}

/// Estimate complexity for optional content.
///
/// Absent content yields [`ComplexityScore::ZERO`], so units without a
/// loaded body sort last under descending order.
#[must_use]
pub fn estimate_opt(content: Option<&str>) -> ComplexityScore {
    content.map_or(ComplexityScore::ZERO, estimate)
}
