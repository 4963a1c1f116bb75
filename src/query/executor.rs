//! Query execution lifecycle: submit, poll, fetch.
//!
//! One query at a time runs through `QueryExecutor::execute`. The polling
//! loop is the only place that observes the cancellation token; an in-flight
//! backend call is never interrupted, only the next wait.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::fetcher::{ResultFetcher, DEFAULT_PAGE_SIZE, DEFAULT_PREVIEW_ROWS};
use super::{bytes_to_human, format_query_cost, FetchSummary};
use crate::athena::{
    QueryBackend, QueryContext, QueryHandle, QueryRequest, QueryState, QueryStatus, SubmitRequest,
};
use crate::config::{Config, PollConfig};
use crate::error::{Result, WaflogsError};

/// Bounds of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Status checks before giving up.
    pub max_attempts: u32,
    /// Check `i` (0-indexed) waits `i * backoff_step` first.
    pub backoff_step: Duration,
    /// Failed status calls tolerated across the whole loop.
    pub max_status_errors: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for PollSettings {
    fn from(config: &PollConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_step: config.backoff_step(),
            max_status_errors: config.max_status_errors,
        }
    }
}

/// How a successful `execute` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Results were already on disk; the backend was not contacted.
    Skipped,
    /// Interrupted by the operator; the remote execution was stopped.
    Cancelled { handle: QueryHandle },
    /// Results were downloaded to the destination.
    Completed {
        handle: QueryHandle,
        bytes_scanned: i64,
        fetch: FetchSummary,
    },
}

impl ExecutionOutcome {
    /// Bytes scanned by the backend; zero unless the query ran to completion.
    pub fn bytes_scanned(&self) -> i64 {
        match self {
            Self::Completed { bytes_scanned, .. } => *bytes_scanned,
            _ => 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Runs queries against a backend and stores their results as CSV.
pub struct QueryExecutor {
    backend: Arc<dyn QueryBackend>,
    context: QueryContext,
    cancel: CancellationToken,
    skip_existing: bool,
    poll: PollSettings,
    page_size: i32,
    preview_rows: usize,
    preview: Box<dyn Write + Send + Sync>,
}

impl QueryExecutor {
    /// Creates an executor that previews results on stdout.
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        context: QueryContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            context,
            cancel,
            skip_existing: false,
            poll: PollSettings::default(),
            page_size: DEFAULT_PAGE_SIZE,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            preview: Box::new(std::io::stdout()),
        }
    }

    /// Creates an executor from the loaded configuration.
    pub fn from_config(
        backend: Arc<dyn QueryBackend>,
        config: &Config,
        skip_existing: bool,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let context = config.athena.query_context()?;
        Ok(Self::new(backend, context, cancel)
            .with_skip_existing(skip_existing)
            .with_poll_settings(PollSettings::from(&config.poll))
            .with_page_size(config.results.page_size)
            .with_preview_rows(config.results.preview_rows))
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    /// Replaces the sink that receives the first rows of every result.
    pub fn with_preview(mut self, preview: Box<dyn Write + Send + Sync>) -> Self {
        self.preview = preview;
        self
    }

    /// Returns true once the operator asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `request` and stores its results at the request's destination.
    ///
    /// Cancellation is reported as `Ok(ExecutionOutcome::Cancelled)`: the
    /// remote query is stopped so it no longer costs money, but the caller
    /// does not see an error.
    pub async fn execute(&mut self, request: &QueryRequest) -> Result<ExecutionOutcome> {
        if request.sql().trim().is_empty() {
            return Err(WaflogsError::invalid_input("refusing to submit empty SQL"));
        }

        let destination = request.destination();
        if self.skip_existing && destination.exists() {
            info!(
                path = %destination.display(),
                "Results already on disk, skipping query"
            );
            return Ok(ExecutionOutcome::Skipped);
        }

        let handle = self
            .backend
            .submit(SubmitRequest {
                sql: request.sql(),
                context: &self.context,
            })
            .await
            .map_err(|e| match e {
                WaflogsError::Submission(_) => e,
                other => WaflogsError::submission(other.to_string()),
            })?;

        info!(query_id = %handle, "Query started");

        let bytes_scanned = match self.poll_until_finished(&handle).await? {
            Some(bytes) => bytes,
            None => return Ok(ExecutionOutcome::Cancelled { handle }),
        };

        let fetcher = ResultFetcher::new(self.backend.as_ref())
            .with_page_size(self.page_size)
            .with_preview_rows(self.preview_rows);
        let fetch = fetcher
            .fetch(&handle, destination, self.preview.as_mut())
            .await
            .map_err(|e| WaflogsError::ResultFetch(Box::new(e)))?;

        Ok(ExecutionOutcome::Completed {
            handle,
            bytes_scanned,
            fetch,
        })
    }

    /// Polls until the query succeeds and returns the bytes it scanned.
    ///
    /// Returns `None` if the query was cancelled on the operator's request.
    async fn poll_until_finished(&self, handle: &QueryHandle) -> Result<Option<i64>> {
        let mut status = QueryStatus::pending();
        let mut status_errors = 0;

        for attempt in 0..self.poll.max_attempts {
            let delay = self.poll.backoff_step * attempt;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(query_id = %handle, "Cancelling query");
                    self.cancel_remote(handle).await?;
                    return Ok(None);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let next = match self.backend.status(handle).await {
                Ok(next) => next,
                Err(e) => {
                    status_errors += 1;
                    if status_errors > self.poll.max_status_errors {
                        return Err(WaflogsError::StatusFetchExhausted {
                            attempts: status_errors,
                            last_error: e.to_string(),
                        });
                    }
                    warn!(query_id = %handle, error = %e, "Getting query status failed");
                    continue;
                }
            };

            if !status.advance(next) {
                warn!(query_id = %handle, "Ignoring status change after query finished");
            }

            match status.state {
                QueryState::Pending => {
                    info!(query_id = %handle, "Query pending");
                }
                QueryState::Failed => {
                    return Err(WaflogsError::ExecutionFailed {
                        reason: status.reason.clone().unwrap_or_default(),
                    });
                }
                QueryState::Successful => {
                    let bytes = status.bytes_scanned.unwrap_or(0);
                    info!(
                        query_id = %handle,
                        "Query finished successfully, scanned {} (~{})",
                        bytes_to_human(bytes),
                        format_query_cost(bytes)
                    );
                    return Ok(Some(bytes));
                }
            }
        }

        Err(WaflogsError::PollTimeout {
            query_id: handle.to_string(),
            attempts: self.poll.max_attempts,
        })
    }

    async fn cancel_remote(&self, handle: &QueryHandle) -> Result<()> {
        self.backend.cancel(handle).await.map_err(|e| match e {
            WaflogsError::Cancellation { .. } => e,
            other => WaflogsError::Cancellation {
                query_id: handle.to_string(),
                message: other.to_string(),
            },
        })
    }
}
