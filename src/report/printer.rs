//! Trend printer for the rate limit report.
//!
//! Reads the loaded per-day results and charts the request rate of the
//! fastest bot user agent over all days on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::chart::{render_trend, scale_to};
use super::rate_limit::{FASTEST_BOT_USER_AGENTS, NAME};
use crate::csv::parse_records;
use crate::error::{Result, WaflogsError};
use crate::sql::Waf;

/// Column of the peak 5-minute request count in the bot user agent results.
const RATE_COLUMN: usize = 4;

/// Height the trend values are scaled to.
const CHART_TOP: f64 = 20.0;
const CHART_WIDTH: u16 = 72;
const CHART_HEIGHT: u16 = 24;

/// Prints the rate limit trend of one WAF.
pub struct RateLimitReportPrinter {
    waf: Waf,
    data_dir: PathBuf,
}

impl RateLimitReportPrinter {
    pub fn new(waf: Waf, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            waf,
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding one sub-directory per loaded day.
    pub fn report_dir(&self) -> PathBuf {
        self.data_dir.join(self.waf.as_str()).join(NAME)
    }

    /// Writes one `day: rate` line per day followed by the trend chart.
    pub fn print(&self, out: &mut dyn Write) -> Result<()> {
        let trend = self.trend()?;
        let report_dir = self.report_dir();
        let write_err = |e| WaflogsError::io("printing report of", &report_dir, e);

        for (day, rate) in &trend {
            writeln!(out, "{day}: {rate}").map_err(write_err)?;
        }

        if let (Some((first, _)), Some((last, _))) = (trend.first(), trend.last()) {
            let rates: Vec<u64> = trend.iter().map(|(_, rate)| *rate).collect();
            let chart = render_trend(
                &scale_to(&rates, CHART_TOP),
                first,
                last,
                CHART_WIDTH,
                CHART_HEIGHT,
            );
            write!(out, "{chart}").map_err(write_err)?;
        }

        Ok(())
    }

    /// Returns `(day, rate)` for every loaded day, oldest first.
    pub fn trend(&self) -> Result<Vec<(String, u64)>> {
        self.list_days()
            .map_err(|e| e.context("listing days"))?
            .into_iter()
            .map(|day| {
                let rate = self.fastest_bot_user_agent_of(&day).map_err(|e| {
                    e.context(format!("getting fastest bot user agent of day {day}"))
                })?;
                Ok((day, rate))
            })
            .collect()
    }

    /// Lists day directories, sorted.
    pub fn list_days(&self) -> Result<Vec<String>> {
        let dir = self.report_dir();
        let entries = std::fs::read_dir(&dir).map_err(|e| WaflogsError::io("reading", &dir, e))?;

        let mut days = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WaflogsError::io("reading", &dir, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| WaflogsError::io("inspecting", &entry.path(), e))?
                .is_dir();
            if is_dir {
                days.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        days.sort();

        Ok(days)
    }

    /// Peak request rate of the fastest bot user agent on `day`.
    ///
    /// A result without data rows counts as zero.
    pub fn fastest_bot_user_agent_of(&self, day: &str) -> Result<u64> {
        let path = self
            .report_dir()
            .join(day)
            .join(format!("{FASTEST_BOT_USER_AGENTS}.csv"));
        let records = read_csv(&path, 2)?;
        debug!(path = %path.display(), records = records.len(), "Read trend input");

        let Some(top) = records.get(1) else {
            return Ok(0);
        };
        let cell = top.get(RATE_COLUMN).ok_or_else(|| {
            WaflogsError::invalid_input(format!(
                "unexpected csv format of {}: {} columns",
                path.display(),
                top.len()
            ))
        })?;

        cell.trim().parse::<u64>().map_err(|e| {
            WaflogsError::invalid_input(format!(
                "parsing number '{cell}' at records[1][{RATE_COLUMN}] of {}: {e}",
                path.display()
            ))
        })
    }
}

/// Reads at most `max` records of a CSV file.
fn read_csv(path: &Path, max: usize) -> Result<Vec<Vec<String>>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| WaflogsError::io("opening", path, e))?;
    parse_records(&content, max).map_err(|e| {
        WaflogsError::invalid_input(format!("reading csv at {}: {e}", path.display()))
    })
}
