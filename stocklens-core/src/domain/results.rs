//! Terminal, write-once result types produced by the engine.

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, RoundingStrategy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::row::SeqNo;

/// Fractional digits of the `avg_worth` fixed-point column.
pub const WORTH_SCALE: u32 = 3;

/// Total digits of the `avg_worth` fixed-point column.
pub const WORTH_PRECISION: u32 = 20;

/// One partition reduced to a single statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub ticker: String,
    /// `None` when the statistic is undefined for this partition.
    pub metric_value: Option<f64>,
    /// Number of values that contributed to `metric_value`.
    pub samples: usize,
    /// Smallest ingestion sequence number in the partition (tie-break key).
    pub first_seq: SeqNo,
}

/// A row selected by the global top-k pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub score: f64,
    pub seq: SeqNo,
}

/// Mean daily return across all tickers for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub average_return: Option<f64>,
    pub samples: usize,
}

/// `highest_worth` relation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestWorthRow {
    pub ticker: String,
    /// `decimal(20,3)`; `None` if the value does not fit.
    pub avg_worth: Option<Decimal>,
}

/// `most_volatile` relation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostVolatileRow {
    pub ticker: String,
    pub standard_deviation: f64,
}

/// `top_30_day_returns` relation row. The score is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopReturnRow {
    pub ticker: String,
    pub date: NaiveDate,
}

impl From<RankedRow> for TopReturnRow {
    fn from(r: RankedRow) -> Self {
        Self {
            ticker: r.ticker,
            date: r.date,
        }
    }
}

/// Round to `decimal(20,3)` half away from zero, always carrying three
/// fractional digits.
///
/// Returns `None` for non-finite input or when the integer part needs more
/// than 17 digits.
pub fn to_fixed_point(value: f64) -> Option<Decimal> {
    let mut rounded = Decimal::from_f64(value)?
        .round_dp_with_strategy(WORTH_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let limit = Decimal::from_i128_with_scale(10_i128.pow(WORTH_PRECISION - WORTH_SCALE), 0);
    if rounded.abs() >= limit {
        return None;
    }
    rounded.rescale(WORTH_SCALE);
    Some(rounded)
}
