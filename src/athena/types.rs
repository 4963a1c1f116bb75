//! Value types exchanged with the query backend.

use std::fmt;
use std::path::PathBuf;

/// A SQL statement and the file its results should land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    sql: String,
    destination: PathBuf,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sql: sql.into(),
            destination: destination.into(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn destination(&self) -> &std::path::Path {
        &self.destination
    }
}

/// Where and how a query runs on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub catalog: String,
    pub database: String,
    pub workgroup: String,
    /// S3 location the backend writes its own copy of the results to.
    pub output_location: String,
}

/// Everything the backend needs to start one execution.
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub sql: &'a str,
    pub context: &'a QueryContext,
}

/// Opaque identifier of one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse execution state of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Queued or running.
    Pending,
    Successful,
    /// Failed or cancelled on the backend.
    Failed,
}

impl QueryState {
    /// Returns true once the state can no longer change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Successful => "successful",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of a query's execution as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    /// Backend explanation for the current state, if any.
    pub reason: Option<String>,
    /// Bytes scanned so far; only reported once the query left `Pending`.
    pub bytes_scanned: Option<i64>,
}

impl QueryStatus {
    pub fn pending() -> Self {
        Self {
            state: QueryState::Pending,
            reason: None,
            bytes_scanned: None,
        }
    }

    pub fn successful(bytes_scanned: i64) -> Self {
        Self {
            state: QueryState::Successful,
            reason: None,
            bytes_scanned: Some(bytes_scanned),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: QueryState::Failed,
            reason: Some(reason.into()),
            bytes_scanned: Some(0),
        }
    }

    /// Replaces this status with `next`, refusing to leave a terminal state.
    ///
    /// Returns false (and keeps the current status) when `next` would move a
    /// finished query back to pending or to another terminal state.
    pub fn advance(&mut self, next: QueryStatus) -> bool {
        if self.state.is_terminal() && next.state != self.state {
            return false;
        }
        *self = next;
        true
    }
}

/// A single result row; `None` marks a null cell.
pub type Row = Vec<Option<String>>;

/// One page of a query's result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Row>,
    /// Present while more pages remain.
    pub next_token: Option<String>,
}

impl ResultPage {
    pub fn new(rows: Vec<Row>, next_token: Option<String>) -> Self {
        Self { rows, next_token }
    }

    /// Returns true if this is the final page.
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_advances_from_pending() {
        let mut status = QueryStatus::pending();
        assert!(status.advance(QueryStatus::pending()));
        assert!(status.advance(QueryStatus::successful(42)));
        assert_eq!(status.state, QueryState::Successful);
        assert_eq!(status.bytes_scanned, Some(42));
    }

    #[test]
    fn test_status_never_leaves_terminal_state() {
        let mut status = QueryStatus::failed("boom");
        assert!(!status.advance(QueryStatus::pending()));
        assert!(!status.advance(QueryStatus::successful(1)));
        assert_eq!(status.state, QueryState::Failed);
        assert_eq!(status.reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_result_page_is_last() {
        assert!(ResultPage::new(vec![], None).is_last());
        assert!(!ResultPage::new(vec![], Some("t".into())).is_last());
    }
}
