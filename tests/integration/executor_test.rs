//! Executor tests against the scripted backend.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use waflogs::athena::{BackendCall, QueryRequest, QueryStatus, ResultPage, ScriptedBackend};
use waflogs::error::WaflogsError;
use waflogs::query::ExecutionOutcome;

use super::common::{executor, paginate, rows, SharedBuf};

#[tokio::test]
async fn test_multi_page_results_land_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.csv");

    let mut all = vec![vec![Some("ip".to_string()), Some("count".to_string())]];
    all.extend(rows("10.0.0.", 24));
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([
                QueryStatus::pending(),
                QueryStatus::pending(),
                QueryStatus::successful(2048),
            ])
            .with_pages(paginate(all, 10)),
    );
    let preview = SharedBuf::default();
    let mut executor = executor(backend.clone(), CancellationToken::new(), preview.clone());

    let outcome = executor
        .execute(&QueryRequest::new("SELECT client_ip, count(*) FROM waf_bc", &dest))
        .await
        .unwrap();

    assert_eq!(outcome.bytes_scanned(), 2048);
    assert_eq!(backend.status_checks(), 3);
    assert_eq!(backend.page_requests(), 3);

    let content = std::fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 25);
    assert_eq!(lines[0], "ip,count");
    assert_eq!(lines[1], "10.0.0.0,0");
    assert_eq!(lines[24], "10.0.0.23,23");

    // The preview shows the first rows only.
    let shown = preview.contents();
    assert_eq!(shown.lines().count(), 20);
    assert!(shown.starts_with("ip,count\n10.0.0.0,0\n"));
}

#[tokio::test]
async fn test_page_tokens_are_passed_along() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([QueryStatus::successful(0)])
            .with_pages(paginate(rows("r", 4), 2)),
    );
    let mut executor = executor(backend.clone(), CancellationToken::new(), SharedBuf::default());

    executor
        .execute(&QueryRequest::new("SELECT 1", dir.path().join("out.csv")))
        .await
        .unwrap();

    let tokens: Vec<Option<String>> = backend
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::ResultPage { token, .. } => Some(token),
            _ => None,
        })
        .collect();
    assert_eq!(tokens, vec![None, Some("token-1".to_string())]);
}

#[tokio::test]
async fn test_second_run_with_skip_existing_submits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.csv");
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([QueryStatus::successful(10)])
            .with_pages([ResultPage::new(rows("a", 2), None)]),
    );
    let mut executor = executor(backend.clone(), CancellationToken::new(), SharedBuf::default())
        .with_skip_existing(true);
    let request = QueryRequest::new("SELECT 1", &dest);

    let first = executor.execute(&request).await.unwrap();
    let before = std::fs::read_to_string(&dest).unwrap();
    let second = executor.execute(&request).await.unwrap();

    assert!(matches!(first, ExecutionOutcome::Completed { .. }));
    assert_eq!(second, ExecutionOutcome::Skipped);
    assert_eq!(backend.submissions(), 1);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), before);
}

#[tokio::test]
async fn test_failed_query_keeps_previous_results() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.csv");
    std::fs::write(&dest, "old,results\n").unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([QueryStatus::pending(), QueryStatus::failed("SYNTAX_ERROR")]),
    );
    let mut executor = executor(backend.clone(), CancellationToken::new(), SharedBuf::default());

    let err = executor
        .execute(&QueryRequest::new("SELEC 1", &dest))
        .await
        .unwrap_err();

    assert!(matches!(err, WaflogsError::ExecutionFailed { .. }));
    assert!(err.to_string().contains("SYNTAX_ERROR"));
    assert_eq!(backend.page_requests(), 0);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "old,results\n");
}

#[tokio::test]
async fn test_cancel_while_running_stops_remote_query() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.csv");
    let cancel = CancellationToken::new();
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([QueryStatus::pending(), QueryStatus::pending()])
            .cancel_after_status(2, cancel.clone()),
    );
    let mut executor = executor(backend.clone(), cancel, SharedBuf::default());

    let outcome = executor
        .execute(&QueryRequest::new("SELECT 1", &dest))
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(backend.status_checks(), 2);
    assert_eq!(backend.cancellations(), 1);
    assert_eq!(backend.page_requests(), 0);
    assert!(!dest.exists());
}
