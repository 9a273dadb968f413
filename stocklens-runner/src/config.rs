//! Pipeline configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) gives a
//! runnable configuration. CLI flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stocklens_core::augment::WindowSpec;
use stocklens_core::engine::DEFAULT_TOP_RETURNS;
use stocklens_core::partition::DuplicatePolicy;
use stocklens_core::window::LagWindow;
use stocklens_core::EngineConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tabular file formats understood by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    Csv,
    Parquet,
}

/// Formats a result table can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub format: InputFormat,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/stocks_data.csv"),
            format: InputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            format: OutputFormat::Parquet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub daily_lag: usize,
    pub monthly_lag: usize,
    pub top_returns: usize,
    pub duplicate_dates: DuplicatePolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            daily_lag: 1,
            monthly_lag: 30,
            top_returns: DEFAULT_TOP_RETURNS,
            duplicate_dates: DuplicatePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for partition evaluation; 0 lets rayon decide.
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub analytics: AnalyticsConfig,
    pub runtime: RuntimeConfig,
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analytics.daily_lag == 0 {
            return Err(ConfigError::Invalid("analytics.daily_lag must be at least 1".into()));
        }
        if self.analytics.monthly_lag == 0 {
            return Err(ConfigError::Invalid("analytics.monthly_lag must be at least 1".into()));
        }
        Ok(())
    }

    /// Engine parameters for this configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let lag = |offset: usize, key: &str| {
            LagWindow::new(offset).map_err(|e| ConfigError::Invalid(format!("analytics.{key}: {e}")))
        };
        Ok(EngineConfig {
            windows: WindowSpec {
                daily: lag(self.analytics.daily_lag, "daily_lag")?,
                monthly: lag(self.analytics.monthly_lag, "monthly_lag")?,
            },
            top_returns: self.analytics.top_returns,
            duplicates: self.analytics.duplicate_dates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.analytics.monthly_lag, 30);
        assert_eq!(config.output.format, OutputFormat::Parquet);
    }

    #[test]
    fn full_file_parses() {
        let config = PipelineConfig::from_toml(
            r#"
            [input]
            path = "prices.parquet"
            format = "parquet"

            [output]
            dir = "out"
            format = "csv"

            [analytics]
            daily_lag = 1
            monthly_lag = 20
            top_returns = 5
            duplicate_dates = "keep_first"

            [runtime]
            workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.input.format, InputFormat::Parquet);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.analytics.duplicate_dates, DuplicatePolicy::KeepFirst);
        assert_eq!(config.runtime.workers, 4);

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.windows.monthly.offset(), 20);
        assert_eq!(engine.top_returns, 5);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = PipelineConfig::from_toml("[analytics]\ntop_returns = 10\n").unwrap();
        assert_eq!(config.analytics.top_returns, 10);
        assert_eq!(config.analytics.daily_lag, 1);
    }

    #[test]
    fn zero_lag_is_invalid() {
        let err = PipelineConfig::from_toml("[analytics]\nmonthly_lag = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_format_is_a_parse_error() {
        let err = PipelineConfig::from_toml("[output]\nformat = \"xlsx\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/stocklens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
