//! AWS Athena backend.
//!
//! Implements `QueryBackend` on top of the AWS SDK. The SDK configuration is
//! loaded from a named profile and region, and credentials are resolved once
//! up front so a broken profile fails before any query is submitted.

use super::{QueryBackend, QueryHandle, QueryState, QueryStatus, ResultPage, Row, SubmitRequest};
use crate::error::{Result, WaflogsError};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    EncryptionConfiguration, EncryptionOption, QueryExecutionContext, QueryExecutionState,
    ResultConfiguration,
};
use aws_sdk_athena::Client;
use tracing::debug;

/// Attempts per SDK call, including the first one.
const SDK_MAX_ATTEMPTS: u32 = 3;

/// Athena query backend.
#[derive(Debug, Clone)]
pub struct AthenaBackend {
    client: Client,
}

impl AthenaBackend {
    /// Loads AWS configuration for `profile` in `region` and verifies credentials.
    pub async fn connect(profile: Option<&str>, region: &str) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::standard().with_max_attempts(SDK_MAX_ATTEMPTS));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let provider = sdk_config
            .credentials_provider()
            .ok_or_else(|| WaflogsError::config("no AWS credentials provider configured"))?;
        provider.provide_credentials().await.map_err(|e| {
            WaflogsError::config(format!(
                "retrieving credentials: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        debug!(?profile, region, "AWS configuration loaded");

        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

/// Maps an Athena execution state onto [`QueryState`].
///
/// A missing state means Athena has not picked the query up yet.
fn map_state(state: Option<&QueryExecutionState>, has_statistics: bool) -> Result<QueryState> {
    match state {
        Some(QueryExecutionState::Queued) | Some(QueryExecutionState::Running) | None => {
            Ok(QueryState::Pending)
        }
        Some(QueryExecutionState::Succeeded) => {
            if !has_statistics {
                return Err(WaflogsError::status_fetch(
                    "no query execution statistics returned",
                ));
            }
            Ok(QueryState::Successful)
        }
        // Athena may retry a failed query on its own; we treat it as final.
        Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
            Ok(QueryState::Failed)
        }
        Some(other) => Err(WaflogsError::invalid_input(format!(
            "unknown query execution state {}",
            other.as_str()
        ))),
    }
}

/// Bytes are only reported once the query is finished.
fn query_status(
    state: QueryState,
    reason: Option<String>,
    bytes_scanned: Option<i64>,
) -> QueryStatus {
    QueryStatus {
        state,
        reason,
        bytes_scanned: match state {
            QueryState::Pending => None,
            _ => Some(bytes_scanned.unwrap_or(0)),
        },
    }
}

#[async_trait]
impl QueryBackend for AthenaBackend {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<QueryHandle> {
        let ctx = request.context;
        let encryption = EncryptionConfiguration::builder()
            .encryption_option(EncryptionOption::SseS3)
            .build()
            .map_err(|e| WaflogsError::submission(format!("encryption settings: {e}")))?;

        let resp = self
            .client
            .start_query_execution()
            .query_string(request.sql)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .catalog(&ctx.catalog)
                    .database(&ctx.database)
                    .build(),
            )
            .work_group(&ctx.workgroup)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&ctx.output_location)
                    .encryption_configuration(encryption)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                WaflogsError::submission(format!(
                    "starting query execution: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        match resp.query_execution_id() {
            Some(id) if !id.is_empty() => Ok(QueryHandle::new(id)),
            _ => Err(WaflogsError::submission("no query execution id returned")),
        }
    }

    async fn status(&self, handle: &QueryHandle) -> Result<QueryStatus> {
        let resp = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                WaflogsError::status_fetch(format!(
                    "getting query execution: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let execution = resp
            .query_execution()
            .ok_or_else(|| WaflogsError::status_fetch("no query execution returned"))?;
        let status = execution
            .status()
            .ok_or_else(|| WaflogsError::status_fetch("no query execution status returned"))?;

        let statistics = execution.statistics();
        let state = map_state(status.state(), statistics.is_some())?;

        Ok(query_status(
            state,
            status.state_change_reason().map(String::from),
            statistics.and_then(|s| s.data_scanned_in_bytes()),
        ))
    }

    async fn result_page(
        &self,
        handle: &QueryHandle,
        token: Option<&str>,
        page_size: i32,
    ) -> Result<ResultPage> {
        let resp = self
            .client
            .get_query_results()
            .query_execution_id(handle.as_str())
            .set_next_token(token.map(String::from))
            .max_results(page_size)
            .send()
            .await
            .map_err(|e| WaflogsError::PageFetch {
                page: 0,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let result_set = resp.result_set().ok_or_else(|| WaflogsError::PageFetch {
            page: 0,
            message: "no result set returned".to_string(),
        })?;

        let rows = result_set
            .rows()
            .iter()
            .map(|row| {
                row.data()
                    .iter()
                    .map(|d| d.var_char_value().map(String::from))
                    .collect::<Row>()
            })
            .collect();

        Ok(ResultPage::new(rows, resp.next_token().map(String::from)))
    }

    async fn cancel(&self, handle: &QueryHandle) -> Result<()> {
        self.client
            .stop_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| WaflogsError::Cancellation {
                query_id: handle.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}
