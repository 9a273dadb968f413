//! Ingestion adapters: CSV and Parquet files into a [`Dataset`].
//!
//! Both adapters assign ingestion sequence numbers in file order. Rows that
//! cannot become a valid observation (bad date, non-numeric or non-finite
//! close/volume, empty ticker) are dropped and counted, never coerced.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use stocklens_core::domain::Dataset;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::InputFormat;

/// Days from 0001-01-01 (CE) to 1970-01-01, polars' `Date` epoch.
pub(crate) const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Column names every input must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["ticker", "date", "close", "volume"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// How many rejected rows are logged individually before going quiet.
const REJECT_LOG_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("parquet error: {0}")]
    Parquet(String),
}

/// A loaded dataset and how many input rows were dropped on the way.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub dataset: Dataset,
    pub rejected_rows: usize,
}

/// Load `path` in the given format.
pub fn ingest(path: &Path, format: InputFormat) -> Result<IngestReport, IngestError> {
    let report = match format {
        InputFormat::Csv => {
            let file = fs::File::open(path).map_err(|source| IngestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ingest_csv(file)?
        }
        InputFormat::Parquet => ingest_parquet(path)?,
    };
    info!(
        path = %path.display(),
        rows = report.dataset.len(),
        rejected = report.rejected_rows,
        tickers = report.dataset.tickers().len(),
        "ingested dataset"
    );
    Ok(report)
}

// ── CSV ──────────────────────────────────────────────────────────────

/// One CSV record before validation. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    ticker: String,
    date: String,
    close: String,
    volume: String,
}

/// Read a headed CSV stream (`ticker,date,close,volume` in any order).
pub fn ingest_csv<R: Read>(reader: R) -> Result<IngestReport, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(IngestError::MissingColumn(col.to_string()));
        }
    }

    let mut dataset = Dataset::new();
    let mut rejected = 0usize;

    for (i, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|rec| parse_csv_record(&rec));
        match parsed {
            Ok((ticker, date, close, volume)) => dataset.push(ticker, date, close, volume),
            Err(reason) => {
                rejected += 1;
                if rejected <= REJECT_LOG_LIMIT {
                    warn!(line, %reason, "rejected input row");
                }
            }
        }
    }

    if rejected > REJECT_LOG_LIMIT {
        warn!(rejected, "further rejected rows not logged individually");
    }

    Ok(IngestReport {
        dataset,
        rejected_rows: rejected,
    })
}

fn parse_csv_record(rec: &CsvRecord) -> Result<(String, NaiveDate, f64, f64), String> {
    if rec.ticker.is_empty() {
        return Err("empty ticker".into());
    }
    let date = parse_date(&rec.date).ok_or_else(|| format!("bad date '{}'", rec.date))?;
    let close = parse_number(&rec.close).ok_or_else(|| format!("bad close '{}'", rec.close))?;
    let volume = parse_number(&rec.volume).ok_or_else(|| format!("bad volume '{}'", rec.volume))?;
    Ok((rec.ticker.clone(), date, close, volume))
}

/// Parse a date in any of the accepted formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Parquet ──────────────────────────────────────────────────────────

/// Read a Parquet file with `ticker`, `date`, `close`, `volume` columns.
///
/// `date` may be a `Date` or a string column; `close` and `volume` may be
/// any numeric type. Nulls make a row rejected.
pub fn ingest_parquet(path: &Path) -> Result<IngestReport, IngestError> {
    let file = fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| IngestError::Parquet(format!("read: {e}")))?;
    dataframe_to_dataset(&df)
}

fn dataframe_to_dataset(df: &DataFrame) -> Result<IngestReport, IngestError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|_| IngestError::MissingColumn(name.to_string()))
    };
    let parquet_err = |what: &str, e: PolarsError| IngestError::Parquet(format!("{what}: {e}"));

    let tickers = column("ticker")?
        .cast(&DataType::String)
        .map_err(|e| parquet_err("ticker cast", e))?;
    let dates = date_column(column("date")?)?;
    let closes = column("close")?
        .cast(&DataType::Float64)
        .map_err(|e| parquet_err("close cast", e))?;
    let volumes = column("volume")?
        .cast(&DataType::Float64)
        .map_err(|e| parquet_err("volume cast", e))?;

    let ticker_ca = tickers.str().map_err(|e| parquet_err("ticker column type", e))?;
    let date_ca = dates.date().map_err(|e| parquet_err("date column type", e))?;
    let close_ca = closes.f64().map_err(|e| parquet_err("close column type", e))?;
    let vol_ca = volumes.f64().map_err(|e| parquet_err("volume column type", e))?;

    let n = df.height();
    let mut dataset = Dataset::with_capacity(n);
    let mut rejected = 0usize;

    for i in 0..n {
        let ticker = ticker_ca.get(i).map(str::trim).filter(|t| !t.is_empty());
        let date = date_ca
            .get(i)
            .and_then(|days| NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE + days));
        let close = close_ca.get(i).filter(|v| v.is_finite());
        let volume = vol_ca.get(i).filter(|v| v.is_finite());

        match (ticker, date, close, volume) {
            (Some(t), Some(d), Some(c), Some(v)) => dataset.push(t, d, c, v),
            _ => {
                rejected += 1;
                if rejected <= REJECT_LOG_LIMIT {
                    warn!(row = i, "rejected input row with null or invalid value");
                }
            }
        }
    }

    Ok(IngestReport {
        dataset,
        rejected_rows: rejected,
    })
}

/// Coerce a `date` column to polars `Date`, parsing strings if needed.
fn date_column(col: &Column) -> Result<Column, IngestError> {
    match col.dtype() {
        DataType::Date => Ok(col.clone()),
        DataType::String => {
            let ca = col
                .str()
                .map_err(|e| IngestError::Parquet(format!("date column type: {e}")))?;
            let days: Vec<Option<i32>> = ca
                .into_iter()
                .map(|s| s.and_then(parse_date).map(days_since_epoch))
                .collect();
            Column::new(col.name().clone(), days)
                .cast(&DataType::Date)
                .map_err(|e| IngestError::Parquet(format!("date cast: {e}")))
        }
        _ => col
            .cast(&DataType::Date)
            .map_err(|e| IngestError::Parquet(format!("date cast: {e}"))),
    }
}

pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
