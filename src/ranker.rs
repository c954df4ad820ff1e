//! Session dwell-time ranking
//!
//! Each consecutive pair of views `(i, i + 1)` credits `t[i + 1] - t[i]` to the
//! page of view `i`, the page being departed. The last view closes no interval,
//! so its page only shows up if it was departed from earlier in the session.
//! Pages are then ranked by total duration, descending.

use crate::error::RankError;
use crate::types::{OrderingPolicy, PageView, RankedPage, RankerConfig, TieBreak};
use std::collections::HashMap;

/// Page -> accumulated duration, remembering first-seen order.
#[derive(Debug, Default)]
pub struct DwellAccumulator {
    index: HashMap<String, usize>,
    totals: Vec<(String, i64)>,
}

impl DwellAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `page`, starting it at zero if unseen
    pub fn accumulate(&mut self, page: &str, delta: i64) {
        match self.index.get(page) {
            Some(&slot) => {
                let total = &mut self.totals[slot].1;
                *total = total.saturating_add(delta);
            }
            None => {
                self.index.insert(page.to_string(), self.totals.len());
                self.totals.push((page.to_string(), delta));
            }
        }
    }

    /// Accumulated duration for `page`, if it was ever departed from
    pub fn get(&self, page: &str) -> Option<i64> {
        self.index.get(page).map(|&slot| self.totals[slot].1)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Sort by duration descending and assign dense 1-based ranks.
    ///
    /// Ranks saturate at `u32::MAX`, past which a session would need more
    /// distinct pages than the declared `rank:int` can hold.
    pub fn into_ranked(self, tie_break: TieBreak) -> Vec<RankedPage> {
        let mut totals = self.totals;

        // `sort_by` is stable, so FirstSeen keeps insertion order among ties.
        match tie_break {
            TieBreak::FirstSeen => totals.sort_by(|a, b| b.1.cmp(&a.1)),
            TieBreak::PageName => totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))),
        }

        totals
            .into_iter()
            .enumerate()
            .map(|(pos, (page, duration))| RankedPage {
                rank: rank_at(pos),
                duration,
                page,
            })
            .collect()
    }
}

fn rank_at(pos: usize) -> u32 {
    u32::try_from(pos).map_or(u32::MAX, |pos| pos.saturating_add(1))
}

/// Rank one session's page views by total dwell time.
///
/// Views must already be in non-decreasing timestamp order; they are not
/// sorted here. A decreasing timestamp is accepted and yields a negative
/// contribution for the departed page. Use [`SessionRanker`] with
/// [`OrderingPolicy::Reject`] to fail instead.
///
/// # Example
/// ```
/// use dwell_rank::{rank_session, PageView};
///
/// let views = vec![
///     PageView::new(0, "A"),
///     PageView::new(2, "B"),
///     PageView::new(10, "A"),
/// ];
/// let ranked = rank_session(&views);
/// assert_eq!(ranked[0].as_tuple(), (1, 8, "B"));
/// assert_eq!(ranked[1].as_tuple(), (2, 2, "A"));
/// ```
pub fn rank_session(views: &[PageView]) -> Vec<RankedPage> {
    accumulate(views).into_ranked(TieBreak::FirstSeen)
}

fn accumulate(views: &[PageView]) -> DwellAccumulator {
    let mut acc = DwellAccumulator::new();
    for pair in views.windows(2) {
        let delta = pair[1].timestamp.saturating_sub(pair[0].timestamp);
        acc.accumulate(&pair[0].page, delta);
    }
    acc
}

/// Ranker with an explicit ordering policy and tie-break rule.
///
/// Holds only configuration; each call builds its own accumulator, so one
/// ranker can serve any number of sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionRanker {
    config: RankerConfig,
}

impl SessionRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank one session's views according to the configured policies
    pub fn rank(&self, views: &[PageView]) -> Result<Vec<RankedPage>, RankError> {
        if self.config.ordering == OrderingPolicy::Reject {
            check_ordering(views)?;
        }
        Ok(accumulate(views).into_ranked(self.config.tie_break))
    }
}

/// First decreasing timestamp, reported with the index of the later view
pub fn check_ordering(views: &[PageView]) -> Result<(), RankError> {
    for (i, pair) in views.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(RankError::InvalidOrdering {
                index: i + 1,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn views(pairs: &[(i64, &str)]) -> Vec<PageView> {
        pairs.iter().map(|&(t, p)| PageView::new(t, p)).collect()
    }

    fn tuples(ranked: &[RankedPage]) -> Vec<(u32, i64, &str)> {
        ranked.iter().map(RankedPage::as_tuple).collect()
    }

    #[test]
    fn test_empty_session() {
        assert!(rank_session(&[]).is_empty());
    }

    #[test]
    fn test_single_view() {
        assert!(rank_session(&views(&[(1379546662, "A")])).is_empty());
    }

    #[test]
    fn test_same_page_twice() {
        let ranked = rank_session(&views(&[(0, "A"), (5, "A")]));
        assert_eq!(tuples(&ranked), vec![(1, 5, "A")]);
    }

    #[test]
    fn test_last_page_never_departed() {
        let ranked = rank_session(&views(&[(0, "A"), (3, "B")]));
        assert_eq!(tuples(&ranked), vec![(1, 3, "A")]);
    }

    #[test]
    fn test_three_views_ranking() {
        let ranked = rank_session(&views(&[(0, "A"), (2, "B"), (10, "A")]));
        assert_eq!(tuples(&ranked), vec![(1, 8, "B"), (2, 2, "A")]);
    }

    #[test]
    fn test_clickstream_sample() {
        let session = views(&[
            (1379546662, "A"),
            (1379546670, "B"),
            (1379546675, "D"),
            (1379546680, "A"),
            (1379546720, "C"),
            (1379546800, "D"),
        ]);
        let ranked = rank_session(&session);
        assert_eq!(
            tuples(&ranked),
            vec![(1, 80, "C"), (2, 48, "A"), (3, 5, "B"), (4, 5, "D")]
        );
    }

    #[test]
    fn test_duplicate_timestamps_contribute_zero() {
        let ranked = rank_session(&views(&[(5, "A"), (5, "B"), (9, "C")]));
        assert_eq!(tuples(&ranked), vec![(1, 4, "B"), (2, 0, "A")]);
    }

    #[test]
    fn test_decreasing_timestamp_accepted_by_default() {
        let ranked = rank_session(&views(&[(10, "A"), (4, "B"), (6, "C")]));
        assert_eq!(tuples(&ranked), vec![(1, 2, "B"), (2, -6, "A")]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let ranked = rank_session(&views(&[(0, "Z"), (3, "M"), (6, "A"), (9, "Z")]));
        assert_eq!(tuples(&ranked), vec![(1, 3, "Z"), (2, 3, "M"), (3, 3, "A")]);
    }

    #[test]
    fn test_page_name_tie_break() {
        let ranker = SessionRanker::new(RankerConfig::default().with_tie_break(TieBreak::PageName));
        let ranked = ranker
            .rank(&views(&[(0, "Z"), (3, "M"), (6, "A"), (9, "Z"), (20, "Q")]))
            .unwrap();
        assert_eq!(
            tuples(&ranked),
            vec![(1, 14, "Z"), (2, 3, "A"), (3, 3, "M")]
        );
    }

    #[test]
    fn test_reject_policy_reports_first_decrease() {
        let ranker = SessionRanker::new(RankerConfig::default().with_ordering(OrderingPolicy::Reject));
        let err = ranker
            .rank(&views(&[(0, "A"), (5, "B"), (3, "C"), (1, "D")]))
            .unwrap_err();
        match err {
            RankError::InvalidOrdering {
                index,
                previous,
                current,
            } => {
                assert_eq!(index, 2);
                assert_eq!(previous, 5);
                assert_eq!(current, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reject_policy_allows_equal_timestamps() {
        let ranker = SessionRanker::new(RankerConfig::default().with_ordering(OrderingPolicy::Reject));
        let ranked = ranker.rank(&views(&[(1, "A"), (1, "B"), (4, "A")])).unwrap();
        assert_eq!(tuples(&ranked), vec![(1, 3, "B"), (2, 0, "A")]);
    }

    /// Deterministic session generator: non-decreasing timestamps over a small
    /// page alphabet, so pages repeat and ties show up.
    fn seeded_session(seed: u64) -> Vec<PageView> {
        const PAGES: [&str; 6] = ["home", "search", "item", "cart", "help", "checkout"];
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            state >> 33
        };

        let len = (next() % 24) as usize;
        let mut timestamp = 1379546662i64;
        (0..len)
            .map(|_| {
                timestamp += (next() % 5) as i64 * (next() % 40) as i64;
                PageView::new(timestamp, PAGES[(next() % PAGES.len() as u64) as usize])
            })
            .collect()
    }

    #[test]
    fn test_repeated_calls_identical() {
        for seed in 0..32 {
            let session = seeded_session(seed);
            let first = rank_session(&session);
            for _ in 0..3 {
                assert_eq!(rank_session(&session), first);
            }
        }
    }

    #[test]
    fn test_ranks_dense_and_sorted() {
        for seed in 0..32 {
            let session = seeded_session(seed);
            let ranked = rank_session(&session);

            let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
            let expected: Vec<u32> = (1..=ranked.len() as u32).collect();
            assert_eq!(ranks, expected, "seed {seed}");

            for pair in ranked.windows(2) {
                assert!(pair[0].duration >= pair[1].duration, "seed {seed}");
            }
        }
    }

    #[test]
    fn test_one_entry_per_departed_page() {
        for seed in 0..32 {
            let session = seeded_session(seed);
            let mut departed: Vec<&str> = match session.split_last() {
                Some((_, rest)) => rest.iter().map(|v| v.page.as_str()).collect(),
                None => Vec::new(),
            };
            departed.sort_unstable();
            departed.dedup();

            let mut ranked: Vec<String> = rank_session(&session).into_iter().map(|r| r.page).collect();
            ranked.sort_unstable();
            assert_eq!(ranked, departed, "seed {seed}");
        }
    }

    #[test]
    fn test_seeded_sessions_vary() {
        let lengths: std::collections::HashSet<usize> = (0..32).map(|s| seeded_session(s).len()).collect();
        assert!(lengths.len() > 4);
        assert!((0..32).any(|s| rank_session(&seeded_session(s)).len() > 3));
    }

    #[test]
    fn test_rank_saturates_at_u32_max() {
        assert_eq!(rank_at(0), 1);
        assert_eq!(rank_at(41), 42);
        assert_eq!(rank_at(u32::MAX as usize - 1), u32::MAX);
        assert_eq!(rank_at(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_contiguous_visits_sum_to_span() {
        let session = views(&[(100, "A"), (110, "A"), (130, "B"), (131, "C"), (200, "D")]);
        let total: i64 = rank_session(&session).iter().map(|r| r.duration).sum();
        assert_eq!(total, 200 - 100);
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let ranked = rank_session(&views(&[(i64::MIN, "A"), (i64::MAX, "B")]));
        assert_eq!(tuples(&ranked), vec![(1, i64::MAX, "A")]);
    }

    #[test]
    fn test_accumulator_accumulate_or_initialize() {
        let mut acc = DwellAccumulator::new();
        assert!(acc.is_empty());
        acc.accumulate("A", 4);
        acc.accumulate("B", 1);
        acc.accumulate("A", 6);
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.get("A"), Some(10));
        assert_eq!(acc.get("B"), Some(1));
        assert_eq!(acc.get("C"), None);
    }

    #[test]
    fn test_check_ordering_ok() {
        assert!(check_ordering(&views(&[(0, "A"), (0, "B"), (2, "C")])).is_ok());
        assert!(check_ordering(&[]).is_ok());
    }
}
