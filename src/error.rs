//! Error types for waflogs.
//!
//! Defines the main error enum used throughout the application.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for waflogs operations.
#[derive(Error, Debug)]
pub enum WaflogsError {
    /// The backend rejected the query or returned no execution id.
    #[error("starting query: {0}")]
    Submission(String),

    /// A single status call failed or returned an incomplete response.
    #[error("getting query status: {0}")]
    StatusFetch(String),

    /// Polling the query state failed more often than tolerated.
    #[error("getting query status failed {attempts} times, last error: {last_error}")]
    StatusFetchExhausted { attempts: u32, last_error: String },

    /// The backend reports that the query itself failed.
    #[error("query execution failed (Reason: {reason})")]
    ExecutionFailed { reason: String },

    /// The query was still pending after the last poll.
    #[error("query {query_id} still pending after {attempts} status checks")]
    PollTimeout { query_id: String, attempts: u32 },

    /// A page of results could not be retrieved.
    #[error("fetching result page {page}: {message}")]
    PageFetch { page: usize, message: String },

    /// Retrieving results of a finished query failed.
    #[error("getting query results: {0}")]
    ResultFetch(#[source] Box<WaflogsError>),

    /// The remote execution could not be stopped.
    #[error("cancelling query {query_id}: {message}")]
    Cancellation { query_id: String, message: String },

    /// A value that cannot be interpreted (unknown WAF, empty SQL, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A SQL template could not be rendered.
    #[error("rendering sql: {0}")]
    Template(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors, with the path that was being accessed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report step failed; wraps the underlying cause.
    #[error("{context}: {source}")]
    Report {
        context: String,
        #[source]
        source: Box<WaflogsError>,
    },
}

impl WaflogsError {
    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a status fetch error with the given message.
    pub fn status_fetch(msg: impl Into<String>) -> Self {
        Self::StatusFetch(msg.into())
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a template error with the given message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an I/O error annotated with the action and path.
    pub fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wraps this error with the report step that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Report {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Submission(_)
            | Self::StatusFetch(_)
            | Self::StatusFetchExhausted { .. }
            | Self::ExecutionFailed { .. }
            | Self::PollTimeout { .. }
            | Self::Cancellation { .. } => "Query Error",
            Self::PageFetch { .. } | Self::ResultFetch(_) => "Result Error",
            Self::InvalidInput(_) | Self::Template(_) => "Input Error",
            Self::Config(_) => "Configuration Error",
            Self::Io { .. } => "I/O Error",
            Self::Report { source, .. } => source.category(),
        }
    }
}

/// Result type alias using WaflogsError.
pub type Result<T> = std::result::Result<T, WaflogsError>;
