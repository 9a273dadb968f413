//! Analytics engine: partitions the dataset, evaluates every partition on
//! the rayon pool, then merges the per-partition results.
//!
//! Per partition (independent, no shared mutable state):
//! 1. daily and monthly lag windows, worth
//! 2. average worth and daily-return volatility
//! 3. per-date daily-return accumulators
//! 4. a local top-k over `return_30_days`
//!
//! The merge is sequential and bounded: one aggregate per partition for the
//! winners, k candidates per partition for the global top-k.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::{
    average_worth, daily_returns_by_date, finish_daily, merge_daily, volatility,
    DailyReturnAccumulator,
};
use crate::augment::{augment_partition, WindowSpec};
use crate::domain::results::{to_fixed_point, HighestWorthRow, MostVolatileRow};
use crate::domain::{AggregateResult, DailyAverage, Dataset, RankedRow, Row};
use crate::partition::{partition_by_ticker, DuplicatePolicy, Partition, PartitionViolation};
use crate::rank::{select_winner, TopK};

/// Default size of the global 30-day-return ranking.
pub const DEFAULT_TOP_RETURNS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("analytics run cancelled")]
    Cancelled,
}

/// Shared cancellation flag, checked once per partition task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-partition progress hook; receives the ticker just evaluated.
pub type PartitionProgress<'a> = dyn Fn(&str) + Sync + 'a;

/// Engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub windows: WindowSpec,
    pub top_returns: usize,
    pub duplicates: DuplicatePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: WindowSpec::default(),
            top_returns: DEFAULT_TOP_RETURNS,
            duplicates: DuplicatePolicy::Reject,
        }
    }
}

/// Every result set of one run, plus what was withheld.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsOutput {
    /// 0 or 1 row.
    pub highest_worth: Vec<HighestWorthRow>,
    /// 0 or 1 row.
    pub most_volatile: Vec<MostVolatileRow>,
    /// 0..=k rows, best first.
    pub top_returns: Vec<RankedRow>,
    /// Date ascending.
    pub average_daily_return: Vec<DailyAverage>,
    /// Number of partitions that were evaluated.
    pub partitions: usize,
    pub violations: Vec<PartitionViolation>,
    /// Tickers withheld from every result.
    pub rejected: Vec<String>,
}

/// What one partition contributes to the merge.
struct PartitionSummary {
    worth: AggregateResult,
    volatility: AggregateResult,
    daily: DailyReturnAccumulator,
    top_returns: TopK<RankedRow>,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every analysis over `dataset` on the current rayon pool.
    pub fn run(&self, dataset: &Dataset, cancel: &CancelFlag) -> Result<AnalyticsOutput, EngineError> {
        self.run_rows(dataset.rows().to_vec(), cancel)
    }

    /// Same as [`run`](Self::run) for rows that already carry sequence numbers.
    ///
    /// The presentation order of `rows` does not affect the output; only each
    /// row's `seq` does.
    pub fn run_rows(&self, rows: Vec<Row>, cancel: &CancelFlag) -> Result<AnalyticsOutput, EngineError> {
        self.run_rows_with_progress(rows, cancel, None)
    }

    /// [`run_rows`](Self::run_rows) with `progress_cb` called from the
    /// worker thread after each partition is evaluated.
    ///
    /// A cancel raised from the callback, or from anywhere else while
    /// partitions are in flight, still yields [`EngineError::Cancelled`].
    pub fn run_rows_with_progress(
        &self,
        rows: Vec<Row>,
        cancel: &CancelFlag,
        progress_cb: Option<&PartitionProgress<'_>>,
    ) -> Result<AnalyticsOutput, EngineError> {
        let row_count = rows.len();
        let set = partition_by_ticker(rows, self.config.duplicates);
        info!(
            rows = row_count,
            partitions = set.partitions.len(),
            rejected = set.rejected.len(),
            "partitioned dataset"
        );

        let summaries = set
            .partitions
            .into_par_iter()
            .map(|p| {
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                let ticker = p.ticker().to_string();
                let summary = self.summarize(p);
                if let Some(cb) = progress_cb {
                    cb(&ticker);
                }
                Ok(summary)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let partitions = summaries.len();
        let mut worth = Vec::with_capacity(partitions);
        let mut vol = Vec::with_capacity(partitions);
        let mut daily = DailyReturnAccumulator::new();
        let mut top = TopK::new(self.config.top_returns);

        for s in summaries {
            worth.push(s.worth);
            vol.push(s.volatility);
            daily = merge_daily(daily, s.daily);
            top = top.merge(s.top_returns);
        }

        let highest_worth = select_winner(worth)
            .map(|w| HighestWorthRow {
                avg_worth: w.metric_value.and_then(to_fixed_point),
                ticker: w.ticker,
            })
            .into_iter()
            .collect::<Vec<_>>();

        let most_volatile = select_winner(vol)
            .and_then(|v| {
                v.metric_value.map(|sd| MostVolatileRow {
                    ticker: v.ticker,
                    standard_deviation: sd,
                })
            })
            .into_iter()
            .collect::<Vec<_>>();

        let top_returns: Vec<RankedRow> = top.into_sorted_vec().into_iter().map(|c| c.item).collect();
        let average_daily_return = finish_daily(daily);

        info!(
            highest_worth = highest_worth.len(),
            most_volatile = most_volatile.len(),
            top_returns = top_returns.len(),
            dates = average_daily_return.len(),
            "analytics complete"
        );

        Ok(AnalyticsOutput {
            highest_worth,
            most_volatile,
            top_returns,
            average_daily_return,
            partitions,
            violations: set.violations,
            rejected: set.rejected,
        })
    }

    fn summarize(&self, partition: Partition<Row>) -> PartitionSummary {
        let augmented = augment_partition(partition, &self.config.windows);

        let mut top_returns = TopK::new(self.config.top_returns);
        for row in augmented.rows() {
            if let Some(score) = row.return_30_days {
                top_returns.offer(
                    Some(score),
                    row.row.seq,
                    RankedRow {
                        ticker: row.row.ticker.clone(),
                        date: row.row.date,
                        score,
                        seq: row.row.seq,
                    },
                );
            }
        }

        let summary = PartitionSummary {
            worth: average_worth(&augmented),
            volatility: volatility(&augmented),
            daily: daily_returns_by_date(&augmented),
            top_returns,
        };
        debug!(
            ticker = augmented.ticker(),
            rows = augmented.len(),
            returns = summary.volatility.samples,
            "partition evaluated"
        );
        summary
    }
}
