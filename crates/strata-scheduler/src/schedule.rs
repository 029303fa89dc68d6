//! LPT (Longest Processing Time first) batch ordering.
//!
//! Dispatching the heaviest units first is optimal for two workers and a
//! 4/3-approximation for three or more on minimizing makespan: it prevents
//! a late-dispatched heavy page from becoming a lone straggler while the
//! other workers sit idle.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::unit::RenderableUnit;

/// How many units to sample for `top`/`bottom` in [`ScheduleStats`].
const SAMPLE_SIZE: usize = 5;

/// Variance ratio above which scheduling materially helps.
const SKEW_THRESHOLD: f64 = 10.0;

/// Sort direction for [`sort_by_complexity`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScheduleOrder {
    /// Heaviest first (LPT). The default for parallel dispatch.
    #[default]
    Descending,
    /// Lightest first.
    Ascending,
}

/// Order a batch of units by complexity.
///
/// Pure: the input is never mutated and the result is a permutation of it.
/// Equal-score units keep their original relative order in both directions;
/// stability comes from the `(score, original_index)` composite key, not
/// from the sort algorithm, since the primary key is derived rather than
/// identity-based.
#[must_use]
pub fn sort_by_complexity<U: RenderableUnit>(units: &[U], order: ScheduleOrder) -> Vec<&U> {
    let mut keyed: Vec<(u64, usize)> = units
        .iter()
        .enumerate()
        .map(|(index, unit)| (unit.complexity().score, index))
        .collect();

    match order {
        ScheduleOrder::Descending => {
            keyed.sort_unstable_by_key(|&(score, index)| (Reverse(score), index));
        }
        ScheduleOrder::Ascending => keyed.sort_unstable_by_key(|&(score, index)| (score, index)),
    }

    keyed.into_iter().map(|(_, index)| &units[index]).collect()
}

/// Whether sorting a batch is worth the cost.
///
/// With `unit_count <= worker_count` every unit dispatches immediately, so
/// ordering cannot improve makespan and the O(n log n) sort plus per-unit
/// estimation is pure overhead. Callers check this before sorting; `sort`
/// itself stays policy-free.
#[must_use]
pub fn should_schedule(unit_count: usize, worker_count: usize) -> bool {
    unit_count > worker_count
}

/// A sampled unit identity with its score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSample {
    /// Unit identity (source path).
    pub unit: String,
    /// Complexity score.
    pub score: u64,
}

/// Score-distribution statistics for a batch.
///
/// Diagnostic only: a high [`variance_ratio`](Self::variance_ratio) signals
/// that LPT ordering materially helps, but the value never changes
/// scheduling behavior.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStats {
    /// Number of units in the batch.
    pub count: usize,
    /// Lowest score.
    pub min: u64,
    /// Highest score.
    pub max: u64,
    /// Mean score.
    pub mean: f64,
    /// Median score.
    pub median: f64,
    /// `max / max(min, 1)`; never divides by zero.
    pub variance_ratio: f64,
    /// The heaviest units, heaviest first.
    pub top: Vec<ScoreSample>,
    /// The lightest units, lightest first.
    pub bottom: Vec<ScoreSample>,
}

impl ScheduleStats {
    /// Compute distribution statistics for a batch.
    ///
    /// Scores come from each unit's memoized slot, so a batch that was
    /// already sorted is never re-scanned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute<U: RenderableUnit>(units: &[U]) -> Self {
        if units.is_empty() {
            return Self::default();
        }

        let mut keyed: Vec<(u64, usize)> = units
            .iter()
            .enumerate()
            .map(|(index, unit)| (unit.complexity().score, index))
            .collect();
        keyed.sort_unstable_by_key(|&(score, index)| (score, index));

        let count = keyed.len();
        let min = keyed[0].0;
        let max = keyed[count - 1].0;
        let total: u64 = keyed.iter().map(|&(score, _)| score).sum();
        let mean = total as f64 / count as f64;
        let median = if count % 2 == 1 {
            keyed[count / 2].0 as f64
        } else {
            (keyed[count / 2 - 1].0 + keyed[count / 2].0) as f64 / 2.0
        };
        let variance_ratio = max as f64 / min.max(1) as f64;

        let sample = |iter: &mut dyn Iterator<Item = &(u64, usize)>| -> Vec<ScoreSample> {
            iter.take(SAMPLE_SIZE)
                .map(|&(score, index)| ScoreSample {
                    unit: units[index].identity().to_owned(),
                    score,
                })
                .collect()
        };
        let bottom = sample(&mut keyed.iter());
        let top = sample(&mut keyed.iter().rev());

        Self {
            count,
            min,
            max,
            mean,
            median,
            variance_ratio,
            top,
            bottom,
        }
    }

    /// Whether the score distribution is skewed enough for LPT ordering to
    /// materially shorten the makespan.
    #[must_use]
    pub fn is_skewed(&self) -> bool {
        self.variance_ratio > SKEW_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::unit::SourcePage;

    /// Pages with synthetic scores driven by code-block count.
    fn pages_with_blocks(blocks: &[usize]) -> Vec<SourcePage> {
        blocks
            .iter()
            .enumerate()
            .map(|(i, &n)| SourcePage::new(format!("page-{i}"), "```\nx\n```\n".repeat(n)))
            .collect()
    }

    fn paths<'a>(sorted: &[&'a SourcePage]) -> Vec<&'a str> {
        sorted.iter().map(|p| p.path()).collect()
    }

    #[test]
    fn test_sort_is_a_permutation() {
        let pages = pages_with_blocks(&[3, 0, 5, 1, 0]);
        let sorted = sort_by_complexity(&pages, ScheduleOrder::Descending);

        assert_eq!(sorted.len(), pages.len());
        let mut seen = paths(&sorted);
        seen.sort_unstable();
        let mut expected: Vec<&str> = pages.iter().map(SourcePage::path).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_sort_does_not_mutate_input() {
        let pages = pages_with_blocks(&[1, 3, 2]);
        let _ = sort_by_complexity(&pages, ScheduleOrder::Descending);
        let original: Vec<&str> = pages.iter().map(SourcePage::path).collect();
        assert_eq!(original, vec!["page-0", "page-1", "page-2"]);
    }

    #[test]
    fn test_descending_order_property() {
        let pages = pages_with_blocks(&[2, 7, 0, 4, 4, 1]);
        let sorted = sort_by_complexity(&pages, ScheduleOrder::Descending);

        for pair in sorted.windows(2) {
            assert!(pair[0].complexity().score >= pair[1].complexity().score);
        }
    }

    #[test]
    fn test_equal_scores_keep_original_order_descending() {
        let pages = pages_with_blocks(&[1, 1, 1, 1]);
        let sorted = sort_by_complexity(&pages, ScheduleOrder::Descending);
        assert_eq!(paths(&sorted), vec!["page-0", "page-1", "page-2", "page-3"]);
    }

    #[test]
    fn test_equal_scores_keep_original_order_ascending() {
        let pages = pages_with_blocks(&[2, 2, 0, 0]);
        let sorted = sort_by_complexity(&pages, ScheduleOrder::Ascending);
        assert_eq!(paths(&sorted), vec!["page-2", "page-3", "page-0", "page-1"]);
    }

    #[test]
    fn test_one_heavy_page_among_many_zeros() {
        // 100 pages: index 42 is heavy, the rest score zero.
        let mut blocks = vec![0usize; 100];
        blocks[42] = 30; // score 300
        let pages = pages_with_blocks(&blocks);

        let sorted = sort_by_complexity(&pages, ScheduleOrder::Descending);
        assert_eq!(sorted[0].path(), "page-42");
        assert_eq!(sorted[0].complexity().score, 300);

        // The zero-scoring pages keep their original relative order.
        let rest: Vec<&str> = paths(&sorted)[1..].to_vec();
        let expected: Vec<String> = (0..100)
            .filter(|&i| i != 42)
            .map(|i| format!("page-{i}"))
            .collect();
        let expected: Vec<&str> = expected.iter().map(String::as_str).collect();
        assert_eq!(rest, expected);
    }

    #[test]
    fn test_should_schedule_boundary() {
        // No benefit when every unit dispatches immediately.
        assert!(!should_schedule(4, 4));
        assert!(!should_schedule(3, 4));
        assert!(should_schedule(5, 4));
        assert!(!should_schedule(0, 1));
    }

    #[test]
    fn test_stats_empty_batch() {
        let pages: Vec<SourcePage> = Vec::new();
        let stats = ScheduleStats::compute(&pages);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.variance_ratio, 0.0);
    }

    #[test]
    fn test_stats_all_zero_scores_never_divide_by_zero() {
        let pages = pages_with_blocks(&[0, 0, 0]);
        let stats = ScheduleStats::compute(&pages);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 0);
        assert_eq!(stats.variance_ratio, 0.0);
        assert!(!stats.is_skewed());
    }

    #[test]
    fn test_stats_distribution() {
        let pages = pages_with_blocks(&[0, 1, 2, 3]); // scores 0, 10, 20, 30
        let stats = ScheduleStats::compute(&pages);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 30);
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.median, 15.0);
        assert_eq!(stats.variance_ratio, 30.0);
        assert!(stats.is_skewed());
    }

    #[test]
    fn test_stats_odd_count_median() {
        let pages = pages_with_blocks(&[1, 2, 3]); // scores 10, 20, 30
        let stats = ScheduleStats::compute(&pages);
        assert_eq!(stats.median, 20.0);
    }

    #[test]
    fn test_stats_samples() {
        let pages = pages_with_blocks(&[0, 1, 2, 3, 4, 5, 6]);
        let stats = ScheduleStats::compute(&pages);

        assert_eq!(stats.top.len(), 5);
        assert_eq!(stats.bottom.len(), 5);
        assert_eq!(stats.top[0].unit, "page-6");
        assert_eq!(stats.top[0].score, 60);
        assert_eq!(stats.bottom[0].unit, "page-0");
        assert_eq!(stats.bottom[0].score, 0);
    }

    #[test]
    fn test_stats_use_memoized_scores() {
        let pages = pages_with_blocks(&[1, 2]);
        let _ = sort_by_complexity(&pages, ScheduleOrder::Descending);
        // Slots were filled by the sort; stats read them back.
        assert!(pages.iter().all(|p| p.score_slot().get().is_some()));
        let stats = ScheduleStats::compute(&pages);
        assert_eq!(stats.max, 20);
    }
}
