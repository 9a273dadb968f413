//! Domain types for StockLens

pub mod dataset;
pub mod results;
pub mod row;

pub use dataset::Dataset;
pub use results::{AggregateResult, DailyAverage, RankedRow};
pub use row::{AugmentedRow, Observation, Row, SeqNo};
