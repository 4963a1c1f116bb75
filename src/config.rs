//! Configuration management for waflogs.
//!
//! Handles loading settings from a TOML file and environment variables, and
//! holds the per-run parameters chosen on the command line.

use crate::athena::QueryContext;
use crate::error::{Result, WaflogsError};
use crate::sql::Waf;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest page Athena returns per `GetQueryResults` call.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Environment variable overriding `athena.output_location`.
pub const OUTPUT_LOCATION_ENV: &str = "WAFLOGS_OUTPUT_LOCATION";

/// Main configuration structure for waflogs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub athena: AthenaConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub results: ResultsConfig,
}

/// Where queries run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    #[serde(default = "default_catalog")]
    pub catalog: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    /// S3 prefix Athena writes query results to.
    pub output_location: Option<String>,
}

fn default_catalog() -> String {
    "AwsDataCatalog".to_string()
}

fn default_database() -> String {
    "waflogs".to_string()
}

fn default_workgroup() -> String {
    "athena3".to_string()
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            database: default_database(),
            workgroup: default_workgroup(),
            output_location: None,
        }
    }
}

impl AthenaConfig {
    /// Builds the backend query context; fails without an output location.
    pub fn query_context(&self) -> Result<QueryContext> {
        let output_location = self.output_location.clone().ok_or_else(|| {
            WaflogsError::config(format!(
                "athena.output_location is not set (config file or {OUTPUT_LOCATION_ENV})"
            ))
        })?;

        if !output_location.starts_with("s3://") {
            return Err(WaflogsError::config(format!(
                "athena.output_location must be an s3:// URL, got '{output_location}'"
            )));
        }

        Ok(QueryContext {
            catalog: self.catalog.clone(),
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
            output_location,
        })
    }
}

/// Status polling bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before check `i` is `i * backoff_step_secs`.
    #[serde(default = "default_backoff_step_secs")]
    pub backoff_step_secs: u64,

    #[serde(default = "default_max_status_errors")]
    pub max_status_errors: u32,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff_step_secs() -> u64 {
    3
}

fn default_max_status_errors() -> u32 {
    3
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_secs: default_backoff_step_secs(),
            max_status_errors: default_max_status_errors(),
        }
    }
}

impl PollConfig {
    pub fn backoff_step(&self) -> Duration {
        Duration::from_secs(self.backoff_step_secs)
    }
}

/// Result download and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_page_size")]
    pub page_size: i32,

    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_page_size() -> i32 {
    MAX_PAGE_SIZE
}

fn default_preview_rows() -> usize {
    20
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            page_size: default_page_size(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waflogs")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file; a missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WaflogsError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            WaflogsError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the executor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.poll.max_attempts == 0 {
            return Err(WaflogsError::config("poll.max_attempts must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.results.page_size) {
            return Err(WaflogsError::config(format!(
                "results.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.results.page_size
            )));
        }
        Ok(())
    }

    /// Applies environment variables on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(location) = std::env::var(OUTPUT_LOCATION_ENV) {
            if !location.is_empty() {
                self.athena.output_location = Some(location);
            }
        }
    }
}

/// Parameters of one invocation, chosen on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Day whose logs are queried.
    pub date: NaiveDate,
    pub waf: Waf,
    /// AWS profile; `None` uses the default credential chain.
    pub profile: Option<String>,
    pub region: String,
    /// Trust result files already on disk instead of re-running their queries.
    pub skip_existing: bool,
}

impl RunConfig {
    /// One-line summary for the log.
    pub fn summary(&self) -> String {
        format!(
            "time = {}, waf = {}, profile = {}, region = {}, force = {}",
            self.date.format("%Y-%m-%d"),
            self.waf,
            self.profile.as_deref().unwrap_or("<default>"),
            self.region,
            !self.skip_existing
        )
    }
}
