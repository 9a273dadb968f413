//! Grouped aggregates: pure functions from a partition to summary statistics.
//!
//! Undefined inputs (`None`) are excluded from counts and sums. An undefined
//! output means "not eligible for ranking", never zero.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::{AggregateResult, AugmentedRow, DailyAverage};
use crate::partition::Partition;
use crate::stats::RunningStats;

/// `sum(worth) / count(rows)` for one ticker.
pub fn average_worth(partition: &Partition<AugmentedRow>) -> AggregateResult {
    let stats: RunningStats = partition.rows().iter().map(|r| r.worth).collect();
    AggregateResult {
        ticker: partition.ticker().to_string(),
        metric_value: stats.mean(),
        samples: stats.count(),
        first_seq: partition.first_seq(),
    }
}

/// Sample standard deviation of defined daily returns for one ticker.
///
/// Undefined with fewer than two defined returns.
pub fn volatility(partition: &Partition<AugmentedRow>) -> AggregateResult {
    let mut stats = RunningStats::new();
    for row in partition.rows() {
        stats.push_opt(row.daily_return);
    }
    AggregateResult {
        ticker: partition.ticker().to_string(),
        metric_value: stats.sample_std_dev(),
        samples: stats.count(),
        first_seq: partition.first_seq(),
    }
}

/// Per-date accumulator of daily returns, keyed in date order.
///
/// Every date present in the partition gets an entry, even when its return is
/// undefined, so all-undefined dates still surface in the output.
pub type DailyReturnAccumulator = BTreeMap<NaiveDate, RunningStats>;

pub fn daily_returns_by_date(partition: &Partition<AugmentedRow>) -> DailyReturnAccumulator {
    let mut acc = DailyReturnAccumulator::new();
    for row in partition.rows() {
        acc.entry(row.row.date).or_default().push_opt(row.daily_return);
    }
    acc
}

/// Combine two per-date accumulators.
pub fn merge_daily(mut into: DailyReturnAccumulator, from: DailyReturnAccumulator) -> DailyReturnAccumulator {
    for (date, stats) in from {
        into.entry(date).or_default().merge(&stats);
    }
    into
}

/// Finish an accumulator into date-ascending averages.
pub fn finish_daily(acc: DailyReturnAccumulator) -> Vec<DailyAverage> {
    acc.into_iter()
        .map(|(date, stats)| DailyAverage {
            date,
            average_return: stats.mean(),
            samples: stats.count(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{augment_partition, WindowSpec};
    use crate::domain::Dataset;
    use crate::partition::{partition_by_ticker, DuplicatePolicy};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn augmented(records: Vec<(&str, u32, f64, f64)>) -> Vec<Partition<AugmentedRow>> {
        let ds = Dataset::from_records(records.into_iter().map(|(t, day, c, v)| (t, d(day), c, v)));
        partition_by_ticker(ds.rows().to_vec(), DuplicatePolicy::Reject)
            .partitions
            .into_iter()
            .map(|p| augment_partition(p, &WindowSpec::default()))
            .collect()
    }

    #[test]
    fn average_worth_scenario() {
        let parts = augmented(vec![
            ("A", 1, 10.0, 100.0),
            ("A", 2, 11.0, 100.0),
            ("A", 3, 9.0, 100.0),
        ]);
        let r = average_worth(&parts[0]);
        assert_eq!(r.ticker, "A");
        assert_eq!(r.metric_value, Some(1000.0));
        assert_eq!(r.samples, 3);
        assert_eq!(r.first_seq, 0);
    }

    #[test]
    fn volatility_matches_sample_std() {
        let parts = augmented(vec![
            ("A", 1, 10.0, 1.0),
            ("A", 2, 11.0, 1.0),
            ("A", 3, 9.0, 1.0),
        ]);
        let r1: f64 = 0.1;
        let r2: f64 = (9.0 - 11.0) / 11.0;
        let mean = (r1 + r2) / 2.0;
        let expected = (((r1 - mean).powi(2) + (r2 - mean).powi(2)) / 1.0).sqrt();

        let v = volatility(&parts[0]);
        assert_eq!(v.samples, 2);
        assert!((v.metric_value.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn volatility_undefined_below_two_returns() {
        let single = augmented(vec![("A", 1, 10.0, 1.0)]);
        assert_eq!(volatility(&single[0]).metric_value, None);

        let two_rows = augmented(vec![("A", 1, 10.0, 1.0), ("A", 2, 12.0, 1.0)]);
        let v = volatility(&two_rows[0]);
        assert_eq!(v.samples, 1);
        assert_eq!(v.metric_value, None);
    }

    #[test]
    fn daily_average_across_tickers() {
        let parts = augmented(vec![
            ("A", 1, 10.0, 1.0),
            ("A", 2, 11.0, 1.0),
            ("B", 1, 20.0, 1.0),
            ("B", 2, 18.0, 1.0),
        ]);
        let acc = parts
            .iter()
            .map(daily_returns_by_date)
            .fold(DailyReturnAccumulator::new(), merge_daily);
        let out = finish_daily(acc);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d(1));
        assert_eq!(out[0].average_return, None);
        assert_eq!(out[0].samples, 0);
        assert_eq!(out[1].date, d(2));
        assert!((out[1].average_return.unwrap() - 0.0).abs() < 1e-12);
        assert_eq!(out[1].samples, 2);
    }
}
