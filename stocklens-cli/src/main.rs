//! StockLens CLI: run the stock analytics pipeline, generate trial data.
//!
//! Commands:
//! - `run`: ingest a dataset, compute every result relation, write outputs
//!   and a JSON run report
//! - `synth`: write a seeded random-walk CSV dataset

mod logging;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use stocklens_core::partition::DuplicatePolicy;
use stocklens_core::CancelFlag;
use stocklens_runner::pipeline::run_from_config;
use stocklens_runner::synthetic::{generate, write_csv, SynthConfig};
use stocklens_runner::{BranchStatus, InputFormat, OutputFormat, PipelineConfig, REPORT_FILE};

#[derive(Parser)]
#[command(
    name = "stocklens",
    about = "StockLens CLI: per-ticker stock analytics over daily price data"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analytics pipeline.
    Run {
        /// Path to a TOML config file. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input dataset path.
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, value_enum)]
        input_format: Option<InputFormatArg>,

        /// Directory receiving one output per relation plus the run report.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long, value_enum)]
        output_format: Option<OutputFormatArg>,

        /// Worker threads (0 = one per core).
        #[arg(long)]
        workers: Option<usize>,

        /// What to do with a ticker that has two rows on one date.
        #[arg(long, value_enum)]
        duplicates: Option<DuplicatesArg>,
    },
    /// Generate a synthetic random-walk CSV dataset.
    Synth {
        #[arg(long, default_value_t = 10)]
        tickers: usize,

        /// Trading days per ticker.
        #[arg(long, default_value_t = 252)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD). Defaults to 2020-01-01.
        #[arg(long)]
        start: Option<String>,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormatArg {
    Csv,
    Parquet,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Parquet,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicatesArg {
    Reject,
    KeepFirst,
}

struct RunArgs {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    input_format: Option<InputFormatArg>,
    output_dir: Option<PathBuf>,
    output_format: Option<OutputFormatArg>,
    workers: Option<usize>,
    duplicates: Option<DuplicatesArg>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Run {
            config,
            input,
            input_format,
            output_dir,
            output_format,
            workers,
            duplicates,
        } => run_cmd(RunArgs {
            config,
            input,
            input_format,
            output_dir,
            output_format,
            workers,
            duplicates,
        }),
        Commands::Synth {
            tickers,
            days,
            seed,
            start,
            out,
        } => synth_cmd(tickers, days, seed, start, out),
    }
}

fn build_config(args: RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(input) = args.input {
        config.input.path = input;
    }
    if let Some(fmt) = args.input_format {
        config.input.format = match fmt {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Parquet => InputFormat::Parquet,
        };
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(fmt) = args.output_format {
        config.output.format = match fmt {
            OutputFormatArg::Parquet => OutputFormat::Parquet,
            OutputFormatArg::Csv => OutputFormat::Csv,
        };
    }
    if let Some(workers) = args.workers {
        config.runtime.workers = workers;
    }
    if let Some(dup) = args.duplicates {
        config.analytics.duplicate_dates = match dup {
            DuplicatesArg::Reject => DuplicatePolicy::Reject,
            DuplicatesArg::KeepFirst => DuplicatePolicy::KeepFirst,
        };
    }

    config.validate()?;
    Ok(config)
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let config = build_config(args)?;
    let report = run_from_config(&config, &CancelFlag::new())?;

    println!(
        "Dataset: {} rows ({} rejected), {} partitions, fingerprint {}",
        report.rows,
        report.rejected_input_rows,
        report.partitions,
        &report.dataset_fingerprint[..12.min(report.dataset_fingerprint.len())]
    );
    if !report.violations.is_empty() {
        println!("Duplicate-date violations: {}", report.violations.len());
    }
    println!();
    println!("{:<22} {:<8} {:>6}", "Relation", "Status", "Rows");
    println!("{}", "-".repeat(38));
    for branch in &report.branches {
        let status = match &branch.status {
            BranchStatus::Written => "ok",
            BranchStatus::Failed(_) => "FAILED",
        };
        println!("{:<22} {:<8} {:>6}", branch.relation.name(), status, branch.rows);
    }
    println!();
    println!(
        "Report written to: {}",
        config.output.dir.join(REPORT_FILE).display()
    );

    let failed: Vec<String> = report
        .failed_branches()
        .map(|b| match &b.status {
            BranchStatus::Failed(msg) => format!("{}: {msg}", b.relation),
            BranchStatus::Written => b.relation.to_string(),
        })
        .collect();
    if !failed.is_empty() {
        bail!("{} relation(s) failed to write:\n  {}", failed.len(), failed.join("\n  "));
    }
    Ok(())
}

fn synth_cmd(tickers: usize, days: usize, seed: u64, start: Option<String>, out: PathBuf) -> Result<()> {
    let mut config = SynthConfig {
        tickers,
        days,
        seed,
        ..SynthConfig::default()
    };
    if let Some(s) = start {
        config.start = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("invalid --start date '{s}' (expected YYYY-MM-DD)"))?;
    }

    let dataset = generate(&config);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = fs::File::create(&out).with_context(|| format!("creating {}", out.display()))?;
    write_csv(&dataset, file).context("writing synthetic CSV")?;

    println!(
        "Wrote {} rows ({} tickers x {} days) to {}",
        dataset.len(),
        tickers,
        days,
        out.display()
    );
    Ok(())
}
