//! Synthetic random-walk datasets for trials and benchmarks.
//!
//! Rows are emitted date-major (every ticker for day 1, then day 2, ...) the
//! way a daily market export is laid out. Weekends are skipped.

use std::io::Write;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use stocklens_core::domain::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub tickers: usize,
    /// Trading days per ticker.
    pub days: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            tickers: 10,
            days: 252,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }
}

pub fn ticker_name(i: usize) -> String {
    format!("SYN{i:03}")
}

/// Generate a deterministic dataset for `config`.
pub fn generate(config: &SynthConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut prices: Vec<f64> = (0..config.tickers)
        .map(|_| rng.gen_range(10.0..500.0))
        .collect();

    let mut ds = Dataset::with_capacity(config.tickers * config.days);
    let mut current = config.start;
    let mut emitted = 0;

    while emitted < config.days {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
            continue;
        }
        for (i, price) in prices.iter_mut().enumerate() {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            *price = (*price * (1.0 + daily_return) * 100.0).round() / 100.0;
            let volume = rng.gen_range(10_000..5_000_000u64) as f64;
            ds.push(ticker_name(i), current, *price, volume);
        }
        emitted += 1;
        current += Duration::days(1);
    }
    ds
}

/// Write `dataset` as a headed `ticker,date,close,volume` CSV.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["ticker", "date", "close", "volume"])?;
    for row in dataset.rows() {
        wtr.write_record([
            row.ticker.clone(),
            row.date.format("%Y-%m-%d").to_string(),
            row.close.to_string(),
            row.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
