//! Scripted query backend for testing.
//!
//! Replays queued statuses and result pages and records every call, so tests
//! can assert on exactly what the executor asked the backend to do.

use super::{QueryBackend, QueryHandle, QueryStatus, ResultPage, SubmitRequest};
use crate::error::{Result, WaflogsError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// A call received by the scripted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Submit { sql: String, database: String },
    Status(QueryHandle),
    ResultPage {
        handle: QueryHandle,
        token: Option<String>,
        page_size: i32,
    },
    Cancel(QueryHandle),
}

#[derive(Default)]
struct Script {
    submit_error: Option<String>,
    cancel_error: Option<String>,
    statuses: VecDeque<std::result::Result<QueryStatus, String>>,
    pages: VecDeque<std::result::Result<ResultPage, String>>,
    cancel_after_status: Option<(usize, CancellationToken)>,
    next_id: usize,
    calls: Vec<BackendCall>,
}

/// A backend that answers from a prepared script.
///
/// Once the status script runs dry every further status call reports
/// `Pending`; once the page script runs dry an empty final page is returned.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues status answers in order.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = QueryStatus>) -> Self {
        self.lock()
            .statuses
            .extend(statuses.into_iter().map(Ok));
        self
    }

    /// Queues a failing status call.
    pub fn with_status_error(self, message: impl Into<String>) -> Self {
        self.lock().statuses.push_back(Err(message.into()));
        self
    }

    /// Queues result pages in order.
    pub fn with_pages(self, pages: impl IntoIterator<Item = ResultPage>) -> Self {
        self.lock().pages.extend(pages.into_iter().map(Ok));
        self
    }

    /// Queues a failing result page call.
    pub fn with_page_error(self, message: impl Into<String>) -> Self {
        self.lock().pages.push_back(Err(message.into()));
        self
    }

    /// Makes every submission fail.
    pub fn failing_submit(self, message: impl Into<String>) -> Self {
        self.lock().submit_error = Some(message.into());
        self
    }

    /// Makes every cancel request fail.
    pub fn failing_cancel(self, message: impl Into<String>) -> Self {
        self.lock().cancel_error = Some(message.into());
        self
    }

    /// Cancels `token` right after the `n`-th status call has been answered.
    pub fn cancel_after_status(self, n: usize, token: CancellationToken) -> Self {
        self.lock().cancel_after_status = Some((n, token));
        self
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn submissions(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Submit { .. }))
    }

    pub fn status_checks(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Status(_)))
    }

    pub fn page_requests(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::ResultPage { .. }))
    }

    pub fn cancellations(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Cancel(_)))
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<QueryHandle> {
        let mut script = self.lock();
        script.calls.push(BackendCall::Submit {
            sql: request.sql.to_string(),
            database: request.context.database.clone(),
        });

        if let Some(msg) = &script.submit_error {
            return Err(WaflogsError::submission(msg.clone()));
        }

        script.next_id += 1;
        Ok(QueryHandle::new(format!("query-{}", script.next_id)))
    }

    async fn status(&self, handle: &QueryHandle) -> Result<QueryStatus> {
        let mut script = self.lock();
        script.calls.push(BackendCall::Status(handle.clone()));

        let answer = script
            .statuses
            .pop_front()
            .unwrap_or_else(|| Ok(QueryStatus::pending()));

        let checks = script
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Status(_)))
            .count();
        if let Some((n, token)) = &script.cancel_after_status {
            if checks >= *n {
                token.cancel();
            }
        }

        answer.map_err(WaflogsError::status_fetch)
    }

    async fn result_page(
        &self,
        handle: &QueryHandle,
        token: Option<&str>,
        page_size: i32,
    ) -> Result<ResultPage> {
        let mut script = self.lock();
        script.calls.push(BackendCall::ResultPage {
            handle: handle.clone(),
            token: token.map(String::from),
            page_size,
        });

        match script.pages.pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(WaflogsError::PageFetch {
                page: script
                    .calls
                    .iter()
                    .filter(|c| matches!(c, BackendCall::ResultPage { .. }))
                    .count()
                    - 1,
                message,
            }),
            None => Ok(ResultPage::default()),
        }
    }

    async fn cancel(&self, handle: &QueryHandle) -> Result<()> {
        let mut script = self.lock();
        script.calls.push(BackendCall::Cancel(handle.clone()));

        match &script.cancel_error {
            Some(message) => Err(WaflogsError::Cancellation {
                query_id: handle.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
