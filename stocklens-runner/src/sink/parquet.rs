//! Parquet output, one directory per relation.
//!
//! Layout: `{dir}/{relation}/part-00000.parquet`

use std::path::{Path, PathBuf};

use polars::prelude::*;
use stocklens_core::domain::results::{WORTH_PRECISION, WORTH_SCALE};
use tracing::debug;

use super::{write_atomic, OutputTable, ResultSink, SinkError};
use crate::ingest::days_since_epoch;

const PART_FILE: &str = "part-00000.parquet";

pub struct ParquetSink {
    dir: PathBuf,
}

impl ParquetSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `relation` is written.
    pub fn part_path(&self, relation: &str) -> PathBuf {
        self.dir.join(relation).join(PART_FILE)
    }
}

impl ResultSink for ParquetSink {
    fn write(&self, table: &OutputTable) -> Result<usize, SinkError> {
        let path = self.part_path(table.relation().name());
        let mut df = table_to_dataframe(table)?;
        write_atomic(&path, |file| {
            ParquetWriter::new(file)
                .finish(&mut df)
                .map(|_| ())
                .map_err(|e| SinkError::Parquet(format!("write parquet: {e}")))
        })?;
        debug!(path = %path.display(), rows = table.len(), "wrote parquet relation");
        Ok(table.len())
    }
}

fn parquet_err(what: &str) -> impl Fn(PolarsError) -> SinkError + '_ {
    move |e| SinkError::Parquet(format!("{what}: {e}"))
}

fn date_column(name: &str, days: Vec<i32>) -> Result<Column, SinkError> {
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(parquet_err("date cast"))
}

/// Convert a result relation to a typed DataFrame.
///
/// `avg_worth` goes through its decimal string form so the stored
/// `Decimal(20,3)` holds exactly the rounded value.
pub(crate) fn table_to_dataframe(table: &OutputTable) -> Result<DataFrame, SinkError> {
    let columns = match table {
        OutputTable::HighestWorth(rows) => {
            let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
            let worth: Vec<Option<String>> = rows
                .iter()
                .map(|r| r.avg_worth.map(|d| d.to_string()))
                .collect();
            vec![
                Column::new("ticker".into(), tickers),
                Column::new("avg_worth".into(), worth)
                    .cast(&DataType::Decimal(
                        Some(WORTH_PRECISION as usize),
                        Some(WORTH_SCALE as usize),
                    ))
                    .map_err(parquet_err("avg_worth cast"))?,
            ]
        }
        OutputTable::MostVolatile(rows) => {
            let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
            let sd: Vec<f64> = rows.iter().map(|r| r.standard_deviation).collect();
            vec![
                Column::new("ticker".into(), tickers),
                Column::new("standard_deviation".into(), sd),
            ]
        }
        OutputTable::TopReturns(rows) => {
            let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
            let dates: Vec<i32> = rows.iter().map(|r| days_since_epoch(r.date)).collect();
            vec![
                Column::new("ticker".into(), tickers),
                date_column("date", dates)?,
            ]
        }
        OutputTable::AverageDailyReturn(rows) => {
            let dates: Vec<i32> = rows.iter().map(|r| days_since_epoch(r.date)).collect();
            let avg: Vec<Option<f64>> = rows.iter().map(|r| r.average_return).collect();
            vec![
                date_column("date", dates)?,
                Column::new("average_return".into(), avg),
            ]
        }
    };
    DataFrame::new(columns).map_err(parquet_err("dataframe creation"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stocklens_core::domain::results::{to_fixed_point, HighestWorthRow, TopReturnRow};

    #[test]
    fn highest_worth_is_a_decimal_column() {
        let table = OutputTable::HighestWorth(vec![HighestWorthRow {
            ticker: "A".into(),
            avg_worth: to_fixed_point(1000.0),
        }]);
        let df = table_to_dataframe(&table).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(
            df.column("avg_worth").unwrap().dtype(),
            &DataType::Decimal(Some(20), Some(3))
        );
    }

    #[test]
    fn empty_tables_still_carry_a_schema() {
        let df = table_to_dataframe(&OutputTable::TopReturns(Vec::new())).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("ticker").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn writes_part_file_under_relation_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ParquetSink::new(dir.path());
        let table = OutputTable::TopReturns(vec![TopReturnRow {
            ticker: "A".into(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        }]);
        assert_eq!(sink.write(&table).unwrap(), 1);

        let path = dir.path().join("top_30_day_returns").join("part-00000.parquet");
        assert!(path.exists());
        let file = std::fs::File::open(&path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 1);
    }
}
