//! CSV output: `{dir}/{relation}.csv` with a header row.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{write_atomic, OutputTable, ResultSink, SinkError};

pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, relation: &str) -> PathBuf {
        self.dir.join(format!("{relation}.csv"))
    }
}

impl ResultSink for CsvSink {
    fn write(&self, table: &OutputTable) -> Result<usize, SinkError> {
        let path = self.file_path(table.relation().name());
        write_atomic(&path, |file| {
            let mut wtr = ::csv::Writer::from_writer(file);
            write_table(&mut wtr, table)?;
            wtr.flush().map_err(|e| SinkError::io(&path, e))
        })?;
        debug!(path = %path.display(), rows = table.len(), "wrote csv relation");
        Ok(table.len())
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Render a relation as header + records. Undefined values are empty cells.
pub(crate) fn write_table<W: std::io::Write>(
    wtr: &mut ::csv::Writer<W>,
    table: &OutputTable,
) -> Result<(), SinkError> {
    match table {
        OutputTable::HighestWorth(rows) => {
            wtr.write_record(["ticker", "avg_worth"])?;
            for r in rows {
                wtr.write_record([r.ticker.clone(), opt(r.avg_worth)])?;
            }
        }
        OutputTable::MostVolatile(rows) => {
            wtr.write_record(["ticker", "standard_deviation"])?;
            for r in rows {
                wtr.write_record([r.ticker.clone(), r.standard_deviation.to_string()])?;
            }
        }
        OutputTable::TopReturns(rows) => {
            wtr.write_record(["ticker", "date"])?;
            for r in rows {
                wtr.write_record([r.ticker.clone(), r.date.format("%Y-%m-%d").to_string()])?;
            }
        }
        OutputTable::AverageDailyReturn(rows) => {
            wtr.write_record(["date", "average_return"])?;
            for r in rows {
                wtr.write_record([r.date.format("%Y-%m-%d").to_string(), opt(r.average_return)])?;
            }
        }
    }
    Ok(())
}
