//! StockLens Core: row model, partitioned windows, aggregates, ranking.
//!
//! This crate contains the analytical heart of the pipeline:
//! - Domain types (rows, augmented rows, datasets, result rows)
//! - Per-ticker partitioning with a duplicate-date policy
//! - Lag-k window evaluation with explicit undefined values
//! - Numerically stable grouped statistics
//! - Bounded, mergeable top-k selection with ingestion-order tie-breaks
//! - A rayon-parallel engine composing all of the above
//!
//! No I/O happens here: ingestion and sinks live in `stocklens-runner`.

pub mod aggregate;
pub mod augment;
pub mod domain;
pub mod engine;
pub mod partition;
pub mod rank;
pub mod stats;
pub mod window;

pub use engine::{
    AnalyticsEngine, AnalyticsOutput, CancelFlag, EngineConfig, EngineError, PartitionProgress,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across rayon tasks is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Row>();
        require_sync::<domain::Row>();
        require_send::<domain::AugmentedRow>();
        require_sync::<domain::AugmentedRow>();
        require_send::<domain::Dataset>();
        require_sync::<domain::Dataset>();
        require_send::<domain::RankedRow>();
        require_sync::<domain::RankedRow>();
        require_send::<domain::AggregateResult>();
        require_sync::<domain::AggregateResult>();

        require_send::<partition::Partition<domain::Row>>();
        require_sync::<partition::Partition<domain::Row>>();
        require_send::<rank::TopK<domain::RankedRow>>();
        require_sync::<rank::TopK<domain::RankedRow>>();
        require_send::<stats::RunningStats>();
        require_sync::<stats::RunningStats>();

        require_send::<AnalyticsEngine>();
        require_sync::<AnalyticsEngine>();
        require_send::<CancelFlag>();
        require_sync::<CancelFlag>();
        require_send::<AnalyticsOutput>();
        require_sync::<AnalyticsOutput>();
    }

    /// Architecture contract: the window evaluator only sees `Observation`s.
    ///
    /// It cannot read volume or previously derived columns, so re-running it
    /// on augmented rows reproduces the same lag columns.
    #[test]
    fn window_evaluator_reads_only_observations() {
        fn _check<T: domain::Observation>(
            w: &window::LagWindow,
            rows: &[T],
        ) -> Vec<window::LagValue> {
            w.evaluate_sorted(rows)
        }
    }
}
