//! Query backend abstraction for waflogs.
//!
//! Provides a trait-based interface to the analytics query service so the
//! executor can run against Athena in production and a scripted backend in
//! tests.

mod client;
mod mock;
mod types;

pub use client::AthenaBackend;
pub use mock::{BackendCall, ScriptedBackend};
pub use types::{
    QueryContext, QueryHandle, QueryRequest, QueryState, QueryStatus, ResultPage, Row,
    SubmitRequest,
};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface of the remote query service.
///
/// Every call is a single round-trip; retries are the caller's business.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Starts a query execution and returns its handle.
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<QueryHandle>;

    /// Fetches the current execution state of a query.
    async fn status(&self, handle: &QueryHandle) -> Result<QueryStatus>;

    /// Fetches one page of results, starting at `token` (or the beginning).
    async fn result_page(
        &self,
        handle: &QueryHandle,
        token: Option<&str>,
        page_size: i32,
    ) -> Result<ResultPage>;

    /// Stops a running execution.
    async fn cancel(&self, handle: &QueryHandle) -> Result<()>;
}
