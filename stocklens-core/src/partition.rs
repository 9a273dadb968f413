//! Grouping rows into per-ticker partitions.
//!
//! A partition holds every row for one ticker, sorted ascending by date with
//! the ingestion sequence number as a secondary key. Sorting on `(date, seq)`
//! keeps the order total even when the input violates the one-row-per-date
//! invariant, so the outcome never depends on hash or task order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{Observation, SeqNo};

/// What to do with a partition that has two rows on the same date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Withhold the whole partition from every result.
    #[default]
    Reject,
    /// Keep the earliest-ingested row per date, drop the rest.
    KeepFirst,
}

/// A duplicate date found inside one ticker's partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionViolation {
    pub ticker: String,
    pub date: NaiveDate,
    /// Sequence numbers of every row sharing `date`, ascending.
    pub seqs: Vec<SeqNo>,
}

/// All rows for one ticker, date-ordered.
#[derive(Debug, Clone)]
pub struct Partition<T> {
    ticker: String,
    rows: Vec<T>,
}

impl<T: Observation> Partition<T> {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest ingestion sequence number in the partition.
    pub fn first_seq(&self) -> SeqNo {
        self.rows.iter().map(|r| r.seq()).min().unwrap_or(SeqNo::MAX)
    }
}

impl<T> Partition<T> {
    /// Replace the rows with a derived sequence, keeping the ticker.
    pub fn map_rows<U, F>(self, f: F) -> Partition<U>
    where
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        Partition {
            ticker: self.ticker,
            rows: f(self.rows),
        }
    }
}

/// Result of grouping: accepted partitions and everything that was flagged.
#[derive(Debug, Clone)]
pub struct PartitionSet<T> {
    /// Partitions ordered by their smallest ingestion sequence number.
    pub partitions: Vec<Partition<T>>,
    pub violations: Vec<PartitionViolation>,
    /// Tickers withheld under [`DuplicatePolicy::Reject`].
    pub rejected: Vec<String>,
}

/// Group `rows` by ticker and sort each group by `(date, seq)`.
///
/// Partitions come out ordered by [`Partition::first_seq`], so the result
/// does not depend on the order `rows` are handed in.
pub fn partition_by_ticker<T>(rows: Vec<T>, policy: DuplicatePolicy) -> PartitionSet<T>
where
    T: Observation,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Partition<T>> = Vec::new();

    for row in rows {
        let slot = match index.get(row.ticker()) {
            Some(&i) => i,
            None => {
                let ticker = row.ticker().to_string();
                index.insert(ticker.clone(), groups.len());
                groups.push(Partition {
                    ticker,
                    rows: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].rows.push(row);
    }

    for group in &mut groups {
        group.rows.sort_by(|a, b| a.date().cmp(&b.date()).then(a.seq().cmp(&b.seq())));
    }
    // Partition order feeds every cross-partition merge; tie it to seq, not presentation.
    groups.sort_by_key(|g| g.first_seq());

    let mut partitions = Vec::with_capacity(groups.len());
    let mut violations = Vec::new();
    let mut rejected = Vec::new();

    for mut group in groups {
        let found = find_duplicate_dates(&group);
        if found.is_empty() {
            partitions.push(group);
            continue;
        }

        for v in &found {
            warn!(
                ticker = %v.ticker,
                date = %v.date,
                rows = v.seqs.len(),
                "duplicate date in partition"
            );
        }
        violations.extend(found);

        match policy {
            DuplicatePolicy::Reject => rejected.push(group.ticker),
            DuplicatePolicy::KeepFirst => {
                // Sorted by (date, seq): the first row of each date run is the earliest ingested.
                group.rows.dedup_by(|later, earlier| later.date() == earlier.date());
                partitions.push(group);
            }
        }
    }

    PartitionSet {
        partitions,
        violations,
        rejected,
    }
}

fn find_duplicate_dates<T: Observation>(partition: &Partition<T>) -> Vec<PartitionViolation> {
    let mut out = Vec::new();
    let rows = &partition.rows;
    let mut i = 0;
    while i < rows.len() {
        let mut j = i + 1;
        while j < rows.len() && rows[j].date() == rows[i].date() {
            j += 1;
        }
        if j - i > 1 {
            out.push(PartitionViolation {
                ticker: partition.ticker.clone(),
                date: rows[i].date(),
                seqs: rows[i..j].iter().map(|r| r.seq()).collect(),
            });
        }
        i = j;
    }
    out
}
