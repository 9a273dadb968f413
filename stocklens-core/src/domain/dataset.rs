//! In-memory dataset handed over by ingestion.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::row::Row;

/// The complete ingested table, in original ingestion order.
///
/// `Dataset` is the only place sequence numbers are assigned: the i-th
/// pushed record gets `seq = i`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Build a dataset from `(ticker, date, close, volume)` records.
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, NaiveDate, f64, f64)>,
        S: Into<String>,
    {
        let mut dataset = Self::new();
        for (ticker, date, close, volume) in records {
            dataset.push(ticker, date, close, volume);
        }
        dataset
    }

    /// Append one record, assigning the next sequence number.
    pub fn push(&mut self, ticker: impl Into<String>, date: NaiveDate, close: f64, volume: f64) {
        let seq = self.rows.len() as u64;
        self.rows.push(Row {
            seq,
            ticker: ticker.into(),
            date,
            close,
            volume,
        });
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct tickers in order of first appearance.
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.ticker.as_str()))
            .map(|r| r.ticker.as_str())
            .collect()
    }

    /// Deterministic BLAKE3 hash over every record in ingestion order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for row in &self.rows {
            hasher.update(row.ticker.as_bytes());
            hasher.update(&[0]);
            hasher.update(row.date.to_string().as_bytes());
            hasher.update(&row.close.to_le_bytes());
            hasher.update(&row.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
