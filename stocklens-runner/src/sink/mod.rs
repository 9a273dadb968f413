//! Result sinks: where each named result relation ends up.
//!
//! The engine produces four tables; the pipeline hands each one to a
//! [`ResultSink`] independently, so one failing relation never blocks the
//! others.

mod csv;
mod parquet;

pub use self::csv::CsvSink;
pub use self::parquet::ParquetSink;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use stocklens_core::domain::results::{HighestWorthRow, MostVolatileRow, TopReturnRow};
use stocklens_core::domain::DailyAverage;
use stocklens_core::AnalyticsOutput;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("sink rejected '{relation}': {reason}")]
    Rejected { relation: String, reason: String },
}

impl SinkError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The four output relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    HighestWorth,
    MostVolatile,
    #[serde(rename = "top_30_day_returns")]
    TopReturns,
    AverageDailyReturn,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::HighestWorth,
        Relation::MostVolatile,
        Relation::TopReturns,
        Relation::AverageDailyReturn,
    ];

    /// Name used for output paths and reports.
    pub fn name(self) -> &'static str {
        match self {
            Relation::HighestWorth => "highest_worth",
            Relation::MostVolatile => "most_volatile",
            Relation::TopReturns => "top_30_day_returns",
            Relation::AverageDailyReturn => "average_daily_return",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One finished result relation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTable {
    HighestWorth(Vec<HighestWorthRow>),
    MostVolatile(Vec<MostVolatileRow>),
    TopReturns(Vec<TopReturnRow>),
    AverageDailyReturn(Vec<DailyAverage>),
}

impl OutputTable {
    pub fn relation(&self) -> Relation {
        match self {
            OutputTable::HighestWorth(_) => Relation::HighestWorth,
            OutputTable::MostVolatile(_) => Relation::MostVolatile,
            OutputTable::TopReturns(_) => Relation::TopReturns,
            OutputTable::AverageDailyReturn(_) => Relation::AverageDailyReturn,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutputTable::HighestWorth(rows) => rows.len(),
            OutputTable::MostVolatile(rows) => rows.len(),
            OutputTable::TopReturns(rows) => rows.len(),
            OutputTable::AverageDailyReturn(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split an engine run into its output relations, in [`Relation::ALL`] order.
    pub fn from_output(output: &AnalyticsOutput) -> Vec<OutputTable> {
        vec![
            OutputTable::HighestWorth(output.highest_worth.clone()),
            OutputTable::MostVolatile(output.most_volatile.clone()),
            OutputTable::TopReturns(output.top_returns.iter().cloned().map(TopReturnRow::from).collect()),
            OutputTable::AverageDailyReturn(output.average_daily_return.clone()),
        ]
    }
}

/// Destination for result relations.
///
/// `write` replaces whatever the sink held for that relation and returns the
/// number of rows written.
pub trait ResultSink: Send + Sync {
    fn write(&self, table: &OutputTable) -> Result<usize, SinkError>;
}

/// Keeps written tables in memory, keyed by relation.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<Relation, OutputTable>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relation: Relation) -> Option<OutputTable> {
        self.tables.lock().ok()?.get(&relation).cloned()
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.tables
            .lock()
            .map(|t| t.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn write(&self, table: &OutputTable) -> Result<usize, SinkError> {
        let mut tables = self.tables.lock().map_err(|_| SinkError::Rejected {
            relation: table.relation().name().to_string(),
            reason: "memory sink lock poisoned".into(),
        })?;
        tables.insert(table.relation(), table.clone());
        Ok(table.len())
    }
}

/// Write `path` by filling a sibling `.tmp` file and renaming it into place.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> Result<(), SinkError>
where
    F: FnOnce(std::fs::File) -> Result<(), SinkError>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = std::fs::File::create(&tmp).map_err(|e| SinkError::io(&tmp, e))?;
    if let Err(e) = fill(file) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        SinkError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn relation_names_are_stable() {
        let names: Vec<&str> = Relation::ALL.iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["highest_worth", "most_volatile", "top_30_day_returns", "average_daily_return"]
        );
        assert_eq!(
            serde_json::to_string(&Relation::TopReturns).unwrap(),
            "\"top_30_day_returns\""
        );
    }

    #[test]
    fn memory_sink_overwrites_per_relation() {
        let sink = MemorySink::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let first = OutputTable::TopReturns(vec![TopReturnRow { ticker: "A".into(), date }]);
        let second = OutputTable::TopReturns(Vec::new());

        assert_eq!(sink.write(&first).unwrap(), 1);
        assert_eq!(sink.write(&second).unwrap(), 0);
        assert_eq!(sink.get(Relation::TopReturns), Some(second));
        assert_eq!(sink.relations(), vec![Relation::TopReturns]);
    }

    #[test]
    fn from_output_orders_relations() {
        let tables = OutputTable::from_output(&AnalyticsOutput::default());
        let relations: Vec<Relation> = tables.iter().map(|t| t.relation()).collect();
        assert_eq!(relations, Relation::ALL.to_vec());
        assert!(tables.iter().all(|t| t.is_empty()));
    }
}
