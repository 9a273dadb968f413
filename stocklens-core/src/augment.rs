//! Row → AugmentedRow transform.
//!
//! Runs the daily and monthly lag windows over one partition and attaches
//! `worth`. Input rows are consumed and re-emitted inside new
//! `AugmentedRow`s; nothing is mutated in place.

use crate::domain::{AugmentedRow, Row};
use crate::partition::Partition;
use crate::window::LagWindow;

/// The two lag windows every partition is evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub daily: LagWindow,
    pub monthly: LagWindow,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            daily: LagWindow::daily(),
            monthly: LagWindow::monthly(),
        }
    }
}

/// Attach every derived column to a date-sorted partition.
pub fn augment_partition(partition: Partition<Row>, spec: &WindowSpec) -> Partition<AugmentedRow> {
    let daily = spec.daily.evaluate(&partition);
    let monthly = spec.monthly.evaluate(&partition);

    partition.map_rows(|rows| {
        rows.into_iter()
            .zip(daily)
            .zip(monthly)
            .map(|((row, d), m)| AugmentedRow {
                worth: row.worth(),
                prev_close: d.lag_close,
                daily_return: d.ret,
                price_30_days_ago: m.lag_close,
                return_30_days: m.ret,
                row,
            })
            .collect()
    })
}
