//! Report loaders and printers.
//!
//! A report is a fixed list of named queries for one [`Scope`]. Loading a
//! report runs each query into `<data_dir>/<WAF>/<report>/<YYYY-MM-DD>/`,
//! next to a copy of the SQL that produced it.

pub mod apc1;
mod chart;
mod printer;
pub mod rate_limit;

pub use chart::{render_trend, scale_to};
pub use printer::RateLimitReportPrinter;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::athena::QueryRequest;
use crate::error::{Result, WaflogsError};
use crate::query::{bytes_to_human, format_query_cost, ExecutionOutcome, QueryExecutor};
use crate::sql::Scope;

/// Reports that can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    RateLimit,
    Apc1,
}

impl ReportKind {
    /// Directory name of the report.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RateLimit => rate_limit::NAME,
            Self::Apc1 => apc1::NAME,
        }
    }

    /// Human-readable title used in log lines and errors.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate limit report",
            Self::Apc1 => "APC1 report",
        }
    }

    /// Renders the report's queries for `scope`, in execution order.
    pub fn queries(&self, scope: &Scope) -> Result<Vec<ReportQuery>> {
        match self {
            Self::RateLimit => rate_limit::queries(scope),
            Self::Apc1 => apc1::queries(scope),
        }
    }
}

/// One rendered query of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// File stem of the `.sql` and `.csv` files.
    pub name: &'static str,
    /// What is being loaded, e.g. "requests per IP blocked by rate limit".
    pub description: &'static str,
    pub sql: String,
}

impl ReportQuery {
    pub fn new(name: &'static str, description: &'static str, sql: String) -> Self {
        Self {
            name,
            description,
            sql,
        }
    }
}

/// Totals of one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub executed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub bytes_scanned: i64,
}

/// Runs report queries and lays out their results on disk.
pub struct ReportLoader {
    executor: QueryExecutor,
    kind: ReportKind,
    scope: Scope,
    data_dir: PathBuf,
}

impl ReportLoader {
    pub fn new(
        executor: QueryExecutor,
        kind: ReportKind,
        scope: Scope,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            kind,
            scope,
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding this report's files for its scope.
    pub fn out_dir(&self) -> PathBuf {
        self.data_dir
            .join(self.scope.waf.as_str())
            .join(self.kind.name())
            .join(self.scope.day_label())
    }

    pub fn ensure_out_dir(&self) -> Result<()> {
        let dir = self.out_dir();
        std::fs::create_dir_all(&dir).map_err(|e| WaflogsError::io("creating", &dir, e))
    }

    /// Loads every query of the report.
    ///
    /// Stops early, without error, once a query was cancelled.
    pub async fn run(&mut self) -> Result<ReportSummary> {
        let title = self.kind.title();
        self.ensure_out_dir()
            .map_err(|e| e.context(format!("preparing {title}")))?;

        let queries = self.kind.queries(&self.scope)?;
        let mut summary = ReportSummary::default();

        for query in queries {
            if self.executor.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            info!("Loading {}...", query.description);
            let outcome = self
                .run_query(&query.sql, query.name)
                .await
                .map_err(|e| e.context(format!("loading {}", query.description)))?;

            match outcome {
                ExecutionOutcome::Skipped => summary.skipped += 1,
                ExecutionOutcome::Cancelled { .. } => {
                    summary.cancelled = true;
                    break;
                }
                ExecutionOutcome::Completed { bytes_scanned, .. } => {
                    summary.executed += 1;
                    summary.bytes_scanned += bytes_scanned;
                }
            }
        }

        if summary.cancelled {
            warn!("{title} cancelled, remaining queries were not run");
        }
        info!(
            executed = summary.executed,
            skipped = summary.skipped,
            "Finished {title}, scanned {} (~{})",
            bytes_to_human(summary.bytes_scanned),
            format_query_cost(summary.bytes_scanned)
        );

        Ok(summary)
    }

    /// Stores `sql` as `<name>.sql` and its results as `<name>.csv`.
    pub async fn run_query(&mut self, sql: &str, name: &str) -> Result<ExecutionOutcome> {
        let out_dir = self.out_dir();

        let query_path = out_dir.join(format!("{name}.sql"));
        std::fs::write(&query_path, sql)
            .map_err(|e| WaflogsError::io("writing query to", &query_path, e))?;

        let results_path = out_dir.join(format!("{name}.csv"));
        let outcome = self
            .executor
            .execute(&QueryRequest::new(sql, &results_path))
            .await?;

        if !outcome.is_cancelled() {
            let lines = count_lines(&results_path)?;
            if lines > 0 {
                // first line is the header
                info!("Query done: number of lines returned: {}", lines - 1);
            }
        }

        Ok(outcome)
    }
}

/// Counts the lines of a text file.
pub fn count_lines(path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|e| WaflogsError::io("opening", path, e))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        line.map_err(|e| WaflogsError::io("reading", path, e))?;
        count += 1;
    }
    Ok(count)
}
