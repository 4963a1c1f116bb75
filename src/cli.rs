//! Command-line argument parsing for waflogs.

use crate::config::RunConfig;
use crate::report::ReportKind;
use crate::sql::Waf;
use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Load WAF traffic reports from Athena and chart them.
#[derive(Parser, Debug)]
#[command(name = "waflogs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory results are stored in (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load data from Athena
    #[command(visible_alias = "l")]
    Load {
        #[command(subcommand)]
        report: LoadTarget,
    },

    /// Print summary reports
    #[command(visible_alias = "r")]
    Report {
        #[command(subcommand)]
        report: ReportTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum LoadTarget {
    /// Load data for the rate limit report
    #[command(visible_alias = "r")]
    RateLimitReport(LoadArgs),

    /// Load data for the APC1 report
    Apc1(LoadArgs),
}

impl LoadTarget {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::RateLimitReport(_) => ReportKind::RateLimit,
            Self::Apc1(_) => ReportKind::Apc1,
        }
    }

    pub fn args(&self) -> &LoadArgs {
        match self {
            Self::RateLimitReport(args) | Self::Apc1(args) => args,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ReportTarget {
    /// Print the rate limit trend
    #[command(visible_alias = "r")]
    RateLimit(ReportArgs),
}

/// Options of the load commands.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Day to check, e.g. 2023-02-21 (default: yesterday)
    #[arg(short = 't', long, value_name = "YYYY-MM-DD", value_parser = parse_day)]
    pub timestamp: Option<NaiveDate>,

    /// WAF to check (BC or ECP)
    #[arg(short, long, default_value = "BC", value_parser = parse_waf)]
    pub waf: Waf,

    /// AWS profile for the account to run queries in
    #[arg(short, long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS region to run queries in
    #[arg(short, long, default_value = "eu-central-1", env = "AWS_REGION")]
    pub region: String,

    /// Re-run queries whose results are already on disk
    #[arg(short, long)]
    pub force: bool,
}

impl LoadArgs {
    /// Builds the run parameters; without `--timestamp` the day before `today`.
    pub fn run_config(&self, today: NaiveDate) -> RunConfig {
        let date = self
            .timestamp
            .unwrap_or_else(|| today.checked_sub_days(Days::new(1)).unwrap_or(today));

        RunConfig {
            date,
            waf: self.waf,
            profile: self.profile.clone(),
            region: self.region.clone(),
            skip_existing: !self.force,
        }
    }
}

/// Options of the report commands.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// WAF to check (BC or ECP)
    #[arg(short, long, default_value = "BC", value_parser = parse_waf)]
    pub waf: Waf,
}

fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid day '{s}': {e}. Expected YYYY-MM-DD"))
}

fn parse_waf(s: &str) -> std::result::Result<Waf, String> {
    s.parse::<Waf>().map_err(|e| e.to_string())
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
