//! Partitioned lag window evaluator.
//!
//! For a lag offset `k` and a date-sorted partition, the row at position `i`
//! gets `lag_close = close[i - k]` when `i >= k` and `None` otherwise. The
//! lag never looks past the start of its own partition, so the first `k`
//! rows of every partition carry no lag and no return.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Observation;
use crate::partition::Partition;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("lag offset must be at least 1")]
    ZeroOffset,
}

/// Lag-derived columns for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagValue {
    pub lag_close: Option<f64>,
    pub ret: Option<f64>,
}

/// A lag-`k` window over date-ordered partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagWindow {
    offset: usize,
}

impl LagWindow {
    pub fn new(offset: usize) -> Result<Self, WindowError> {
        if offset == 0 {
            return Err(WindowError::ZeroOffset);
        }
        Ok(Self { offset })
    }

    /// Lag-1 window used for daily returns.
    pub const fn daily() -> Self {
        Self { offset: 1 }
    }

    /// Lag-30 window used for 30-day returns.
    pub const fn monthly() -> Self {
        Self { offset: 30 }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Evaluate the window over an already date-sorted slice.
    ///
    /// The output is aligned with `rows`: `out[i]` belongs to `rows[i]`.
    pub fn evaluate_sorted<T: Observation>(&self, rows: &[T]) -> Vec<LagValue> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let lag_close = i.checked_sub(self.offset).map(|j| rows[j].close());
                LagValue {
                    lag_close,
                    ret: relative_change(row.close(), lag_close),
                }
            })
            .collect()
    }

    /// Evaluate the window over one partition.
    pub fn evaluate<T: Observation>(&self, partition: &Partition<T>) -> Vec<LagValue> {
        self.evaluate_sorted(partition.rows())
    }
}

/// `(close - lag_close) / lag_close`.
///
/// `None` when the lag is missing, the lag is zero, or the result is not
/// finite. Division by zero is an undefined value, not an error.
pub fn relative_change(close: f64, lag_close: Option<f64>) -> Option<f64> {
    let lag = lag_close?;
    if lag == 0.0 {
        return None;
    }
    let ret = (close - lag) / lag;
    ret.is_finite().then_some(ret)
}
