//! StockLens Runner: configuration, ingestion, sinks, pipeline orchestration.
//!
//! This crate builds on `stocklens-core` to provide:
//! - TOML pipeline configuration with defaults
//! - CSV and Parquet ingestion with rejected-row accounting
//! - Parquet, CSV and in-memory result sinks
//! - The pipeline orchestrator with per-branch reporting
//! - Seeded synthetic datasets

pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod sink;
pub mod synthetic;

pub use config::{ConfigError, InputFormat, OutputFormat, PipelineConfig};
pub use ingest::{ingest, IngestError, IngestReport};
pub use pipeline::{
    run_from_config, run_pipeline, run_pipeline_with_progress, sink_for, BranchReport,
    BranchStatus, PipelineError, PipelineReport, REPORT_FILE,
};
pub use sink::{CsvSink, MemorySink, OutputTable, ParquetSink, Relation, ResultSink, SinkError};
pub use synthetic::SynthConfig;
