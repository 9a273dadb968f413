//! Pipeline orchestration: engine run on a sized rayon pool, then one sink
//! write per result relation.
//!
//! Branches are independent once the engine has finished. A sink failure is
//! recorded against its own branch and the others are still written. A
//! cancelled run writes nothing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stocklens_core::partition::PartitionViolation;
use stocklens_core::{AnalyticsEngine, CancelFlag, EngineError, PartitionProgress};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigError, OutputConfig, OutputFormat, PipelineConfig};
use crate::ingest::{ingest, IngestError, IngestReport};
use crate::sink::{CsvSink, OutputTable, ParquetSink, Relation, ResultSink};

/// File name of the JSON run report inside the output directory.
pub const REPORT_FILE: &str = "run_report.json";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("pipeline cancelled; nothing was written")]
    Cancelled,

    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Cancelled => PipelineError::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Written,
    Failed(String),
}

/// Outcome of one output relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReport {
    pub relation: Relation,
    pub status: BranchStatus,
    /// Rows handed to the sink.
    pub rows: usize,
    /// Partitions withheld from this relation.
    pub implicated_partitions: Vec<String>,
}

impl BranchReport {
    pub fn is_written(&self) -> bool {
        self.status == BranchStatus::Written
    }
}

/// Summary of one pipeline run, serialized as the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub dataset_fingerprint: String,
    pub rows: usize,
    /// Input rows dropped by ingestion before the engine saw them.
    #[serde(default)]
    pub rejected_input_rows: usize,
    /// Partitions evaluated by the engine.
    pub partitions: usize,
    pub violations: Vec<PartitionViolation>,
    pub branches: Vec<BranchReport>,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.branches.iter().all(BranchReport::is_written)
    }

    pub fn failed_branches(&self) -> impl Iterator<Item = &BranchReport> {
        self.branches.iter().filter(|b| !b.is_written())
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Report {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| PipelineError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Sink for the configured output directory and format.
pub fn sink_for(output: &OutputConfig) -> Box<dyn ResultSink> {
    match output.format {
        OutputFormat::Parquet => Box::new(ParquetSink::new(&output.dir)),
        OutputFormat::Csv => Box::new(CsvSink::new(&output.dir)),
    }
}

/// Run the engine over an ingested dataset and write every relation to `sink`.
pub fn run_pipeline(
    ingested: &IngestReport,
    config: &PipelineConfig,
    sink: &dyn ResultSink,
    cancel: &CancelFlag,
) -> Result<PipelineReport, PipelineError> {
    run_pipeline_with_progress(ingested, config, sink, cancel, None)
}

/// [`run_pipeline`] with a per-partition progress callback forwarded to the
/// engine. Cancelling from the callback aborts before any sink write.
pub fn run_pipeline_with_progress(
    ingested: &IngestReport,
    config: &PipelineConfig,
    sink: &dyn ResultSink,
    cancel: &CancelFlag,
    progress_cb: Option<&PartitionProgress<'_>>,
) -> Result<PipelineReport, PipelineError> {
    let started = Instant::now();
    let dataset = &ingested.dataset;
    config.validate()?;
    let engine = AnalyticsEngine::new(config.engine_config()?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.runtime.workers)
        .build()
        .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

    info!(
        rows = dataset.len(),
        workers = pool.current_num_threads(),
        "starting analytics run"
    );

    let output =
        pool.install(|| engine.run_rows_with_progress(dataset.rows().to_vec(), cancel, progress_cb))?;

    // Last chance to abandon the run before anything is written.
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let tables = OutputTable::from_output(&output);
    let implicated = output.rejected.clone();
    let branches: Vec<BranchReport> = pool.install(|| {
        tables
            .par_iter()
            .map(|table| write_branch(sink, table, &implicated))
            .collect()
    });

    let report = PipelineReport {
        dataset_fingerprint: dataset.fingerprint(),
        rows: dataset.len(),
        rejected_input_rows: ingested.rejected_rows,
        partitions: output.partitions,
        violations: output.violations,
        branches,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        branches = report.branches.len(),
        failed = report.failed_branches().count(),
        elapsed_ms = report.elapsed_ms,
        "pipeline finished"
    );
    Ok(report)
}

/// Ingest the configured input, run the pipeline, and write the report
/// next to the outputs.
pub fn run_from_config(
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<PipelineReport, PipelineError> {
    let ingested = ingest(&config.input.path, config.input.format)?;
    let sink = sink_for(&config.output);
    let report = run_pipeline(&ingested, config, sink.as_ref(), cancel)?;
    report.write_json(&config.output.dir.join(REPORT_FILE))?;
    Ok(report)
}

fn write_branch(sink: &dyn ResultSink, table: &OutputTable, implicated: &[String]) -> BranchReport {
    let relation = table.relation();
    let status = match sink.write(table) {
        Ok(rows) => {
            info!(%relation, rows, "relation written");
            BranchStatus::Written
        }
        Err(e) => {
            error!(%relation, error = %e, "relation write failed");
            BranchStatus::Failed(e.to_string())
        }
    };
    BranchReport {
        relation,
        status,
        rows: table.len(),
        implicated_partitions: implicated.to_vec(),
    }
}
