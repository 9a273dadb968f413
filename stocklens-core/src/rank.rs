//! Top-k selection: bounded, deterministic, mergeable.
//!
//! Candidates are ordered by score descending, then by ingestion sequence
//! number ascending. Only finite scores are admitted; undefined scores never
//! enter the structure. Because the order is total and depends only on
//! `(score, seq)`, merging local top-k sets in any order yields the same
//! global top-k.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::domain::{AggregateResult, SeqNo};

/// A scored item waiting to be ranked.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub score: f64,
    pub seq: SeqNo,
    pub item: T,
}

impl<T> Candidate<T> {
    /// `Greater` means ranked ahead.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialEq for Candidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Candidate<T> {}

impl<T> PartialOrd for Candidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Candidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Outcome of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResult {
    /// Room was available.
    Inserted,
    /// Entered by evicting the current worst candidate.
    Replaced,
    /// Undefined or non-finite score, or not better than the current worst.
    Skipped,
}

/// Bounded holder of the k best candidates.
///
/// Backed by a min-heap on rank, so the current worst sits on top and each
/// offer costs `O(log k)`.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    k: usize,
    heap: BinaryHeap<Reverse<Candidate<T>>>,
}

impl<T> TopK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.min(1024) + 1),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer a candidate whose score may be undefined.
    pub fn offer(&mut self, score: Option<f64>, seq: SeqNo, item: T) -> OfferResult {
        match score {
            Some(s) if s.is_finite() => self.push(Candidate { score: s, seq, item }),
            _ => OfferResult::Skipped,
        }
    }

    fn push(&mut self, candidate: Candidate<T>) -> OfferResult {
        if self.k == 0 {
            return OfferResult::Skipped;
        }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
            return OfferResult::Inserted;
        }
        match self.heap.peek() {
            Some(Reverse(worst)) if candidate > *worst => {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
                OfferResult::Replaced
            }
            _ => OfferResult::Skipped,
        }
    }

    /// Fold another (local) top-k into this one.
    pub fn merge(mut self, other: TopK<T>) -> Self {
        for Reverse(candidate) in other.heap {
            self.push(candidate);
        }
        self
    }

    /// Best first.
    pub fn into_sorted_vec(self) -> Vec<Candidate<T>> {
        // `into_sorted_vec` sorts ascending by `Reverse`, i.e. best first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(c)| c)
            .collect()
    }
}

/// Select the k best of `candidates`, best first.
pub fn select_top_k<T, I>(candidates: I, k: usize) -> Vec<Candidate<T>>
where
    I: IntoIterator<Item = (Option<f64>, SeqNo, T)>,
{
    let mut top = TopK::new(k);
    for (score, seq, item) in candidates {
        top.offer(score, seq, item);
    }
    top.into_sorted_vec()
}

/// Single-winner selection over aggregate results.
///
/// Ties go to the ticker that appeared first in ingestion order. `None` when
/// every metric is undefined (or there are no results at all).
pub fn select_winner<I>(results: I) -> Option<AggregateResult>
where
    I: IntoIterator<Item = AggregateResult>,
{
    select_top_k(
        results.into_iter().map(|r| (r.metric_value, r.first_seq, r)),
        1,
    )
    .into_iter()
    .next()
    .map(|c| c.item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(top: Vec<Candidate<&str>>) -> Vec<(f64, &str)> {
        top.into_iter().map(|c| (c.score, c.item)).collect()
    }

    #[test]
    fn keeps_k_best_sorted_descending() {
        let top = select_top_k(
            vec![
                (Some(1.0), 0, "a"),
                (Some(3.0), 1, "b"),
                (Some(2.0), 2, "c"),
                (Some(4.0), 3, "d"),
            ],
            3,
        );
        assert_eq!(scores(top), vec![(4.0, "d"), (3.0, "b"), (2.0, "c")]);
    }

    #[test]
    fn ties_break_on_lower_seq() {
        let top = select_top_k(
            vec![(Some(1.0), 5, "late"), (Some(1.0), 2, "early"), (Some(1.0), 9, "last")],
            2,
        );
        assert_eq!(scores(top), vec![(1.0, "early"), (1.0, "late")]);
    }

    #[test]
    fn undefined_and_non_finite_scores_are_skipped() {
        let mut top = TopK::new(3);
        assert_eq!(top.offer(None, 0, "none"), OfferResult::Skipped);
        assert_eq!(top.offer(Some(f64::NAN), 1, "nan"), OfferResult::Skipped);
        assert_eq!(top.offer(Some(f64::INFINITY), 2, "inf"), OfferResult::Skipped);
        assert_eq!(top.offer(Some(0.5), 3, "ok"), OfferResult::Inserted);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn replaces_worst_when_full() {
        let mut top = TopK::new(2);
        top.offer(Some(1.0), 0, "a");
        top.offer(Some(2.0), 1, "b");
        assert_eq!(top.offer(Some(0.5), 2, "c"), OfferResult::Skipped);
        assert_eq!(top.offer(Some(3.0), 3, "d"), OfferResult::Replaced);
        assert_eq!(scores(top.into_sorted_vec()), vec![(3.0, "d"), (2.0, "b")]);
    }

    #[test]
    fn zero_k_is_always_empty() {
        let top = select_top_k(vec![(Some(1.0), 0, "a")], 0);
        assert!(top.is_empty());
    }

    #[test]
    fn merge_order_does_not_matter() {
        let build = |items: &[(f64, u64)]| {
            let mut t = TopK::new(3);
            for &(s, q) in items {
                t.offer(Some(s), q, q);
            }
            t
        };
        let a = [(5.0, 0), (1.0, 1), (3.0, 2)];
        let b = [(5.0, 3), (4.0, 4)];
        let c = [(2.0, 5), (6.0, 6)];

        let ab_c = build(&a).merge(build(&b)).merge(build(&c)).into_sorted_vec();
        let c_ba = build(&c).merge(build(&b).merge(build(&a))).into_sorted_vec();

        let ids = |v: Vec<Candidate<u64>>| v.into_iter().map(|c| c.item).collect::<Vec<_>>();
        assert_eq!(ids(ab_c), vec![6, 0, 3]);
        assert_eq!(ids(c_ba), vec![6, 0, 3]);
    }

    #[test]
    fn winner_prefers_first_ingested_on_tie() {
        let results = vec![
            AggregateResult {
                ticker: "LATE".into(),
                metric_value: Some(10.0),
                samples: 1,
                first_seq: 4,
            },
            AggregateResult {
                ticker: "EARLY".into(),
                metric_value: Some(10.0),
                samples: 1,
                first_seq: 1,
            },
        ];
        assert_eq!(select_winner(results).unwrap().ticker, "EARLY");
    }

    #[test]
    fn winner_none_when_all_undefined() {
        let results = vec![AggregateResult {
            ticker: "A".into(),
            metric_value: None,
            samples: 0,
            first_seq: 0,
        }];
        assert!(select_winner(results).is_none());
        assert!(select_winner(Vec::new()).is_none());
    }
}
