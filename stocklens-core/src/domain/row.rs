//! Row: the fundamental market data unit, plus its engine-derived form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Position of a row in the original ingestion order.
///
/// Every ranking stage breaks score ties on this value, never on
/// task-completion order.
pub type SeqNo = u64;

/// Daily close/volume record for a single ticker on a single day.
///
/// Created once by ingestion and never mutated. Derived columns live on
/// [`AugmentedRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub seq: SeqNo,
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

impl Row {
    /// Per-row liquidity-weighted value: `close * volume`.
    pub fn worth(&self) -> f64 {
        self.close * self.volume
    }
}

/// A row with every engine-derived column attached.
///
/// All derived columns except `worth` are `None` when the partition has too
/// little history (or the lagged close is zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedRow {
    pub row: Row,
    pub prev_close: Option<f64>,
    pub daily_return: Option<f64>,
    pub worth: f64,
    pub price_30_days_ago: Option<f64>,
    pub return_30_days: Option<f64>,
}

/// Read access to the columns the window evaluator orders and lags on.
///
/// Implemented by both [`Row`] and [`AugmentedRow`] so the evaluator can be
/// re-run on already-augmented data.
pub trait Observation {
    fn ticker(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn close(&self) -> f64;
    fn seq(&self) -> SeqNo;
}

impl Observation for Row {
    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn seq(&self) -> SeqNo {
        self.seq
    }
}

impl Observation for AugmentedRow {
    fn ticker(&self) -> &str {
        &self.row.ticker
    }

    fn date(&self) -> NaiveDate {
        self.row.date
    }

    fn close(&self) -> f64 {
        self.row.close
    }

    fn seq(&self) -> SeqNo {
        self.row.seq
    }
}
