//! Report loading and printing over the scripted backend.

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use waflogs::athena::{BackendCall, QueryStatus, ResultPage, Row, ScriptedBackend};
use waflogs::report::{rate_limit, RateLimitReportPrinter, ReportKind, ReportLoader};
use waflogs::sql::{Scope, Waf};

use super::common::{executor, SharedBuf};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 2, d).unwrap()
}

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| Some(c.to_string())).collect()
}

/// One single-page result per rate limit query; the bot query reports `rate`.
fn rate_limit_backend(rate: u64) -> ScriptedBackend {
    let ip_header = row(&["client_ip", "country", "requests"]);
    let ua_header = row(&["bot_name", "bot_category", "user_agent", "requests"]);
    let fast_header = row(&[
        "bot_name",
        "bot_category",
        "user_agent",
        "total_requests",
        "max_requests_per_5min",
    ]);

    ScriptedBackend::new()
        .with_statuses([
            QueryStatus::successful(100),
            QueryStatus::successful(200),
            QueryStatus::successful(300),
            QueryStatus::successful(400),
        ])
        .with_pages([
            ResultPage::new(vec![ip_header, row(&["1.2.3.4", "DE", "5000"])], None),
            ResultPage::new(vec![ua_header, row(&["", "", "curl/8.0", "4000"])], None),
            ResultPage::new(vec![row(&["client_ip", "country", "total_requests"])], None),
            ResultPage::new(
                vec![
                    fast_header,
                    vec![
                        Some("Googlebot".to_string()),
                        None,
                        Some("Mozilla/5.0 (compatible; Googlebot/2.1)".to_string()),
                        Some("9000".to_string()),
                        Some(rate.to_string()),
                    ],
                ],
                None,
            ),
        ])
}

#[tokio::test]
async fn test_rate_limit_report_writes_sql_and_results() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(rate_limit_backend(312));
    let mut loader = ReportLoader::new(
        executor(backend.clone(), CancellationToken::new(), SharedBuf::default()),
        ReportKind::RateLimit,
        Scope::new(Waf::Bc, day(21)),
        dir.path(),
    );

    let summary = loader.run().await.unwrap();

    assert_eq!(summary.executed, 4);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.cancelled);
    assert_eq!(summary.bytes_scanned, 1000);

    let out_dir = dir.path().join("BC").join(rate_limit::NAME).join("2023-02-21");
    assert_eq!(loader.out_dir(), out_dir);
    for name in [
        "ips-blocked-by-rate-limit",
        "user-agents-blocked-by-rate-limit",
        "fastest-ips-not-black-or-whitelisted",
        rate_limit::FASTEST_BOT_USER_AGENTS,
    ] {
        assert!(out_dir.join(format!("{name}.sql")).is_file(), "{name}.sql");
        assert!(out_dir.join(format!("{name}.csv")).is_file(), "{name}.csv");
    }

    // The stored SQL is exactly what was submitted.
    let submitted: Vec<String> = backend
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::Submit { sql, .. } => Some(sql),
            _ => None,
        })
        .collect();
    assert_eq!(
        std::fs::read_to_string(out_dir.join("ips-blocked-by-rate-limit.sql")).unwrap(),
        submitted[0]
    );

    let bots = std::fs::read_to_string(
        out_dir.join(format!("{}.csv", rate_limit::FASTEST_BOT_USER_AGENTS)),
    )
    .unwrap();
    assert_eq!(
        bots,
        "bot_name,bot_category,user_agent,total_requests,max_requests_per_5min\n\
         Googlebot,,Mozilla/5.0 (compatible; Googlebot/2.1),9000,312\n"
    );
}

#[tokio::test]
async fn test_reloading_a_day_skips_existing_results() {
    let dir = tempfile::tempdir().unwrap();
    let scope = Scope::new(Waf::Ecp, day(21));

    let first = Arc::new(rate_limit_backend(10));
    ReportLoader::new(
        executor(first, CancellationToken::new(), SharedBuf::default()).with_skip_existing(true),
        ReportKind::RateLimit,
        scope,
        dir.path(),
    )
    .run()
    .await
    .unwrap();

    let second = Arc::new(ScriptedBackend::new());
    let summary = ReportLoader::new(
        executor(second.clone(), CancellationToken::new(), SharedBuf::default())
            .with_skip_existing(true),
        ReportKind::RateLimit,
        scope,
        dir.path(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.executed, 0);
    assert_eq!(second.submissions(), 0);
}

#[tokio::test]
async fn test_cancelled_report_stops_after_current_query() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    // First query succeeds, the second is cancelled while pending.
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_statuses([QueryStatus::successful(100), QueryStatus::pending()])
            .with_pages([ResultPage::new(vec![row(&["client_ip"])], None)])
            .cancel_after_status(2, cancel.clone()),
    );
    let mut loader = ReportLoader::new(
        executor(backend.clone(), cancel, SharedBuf::default()),
        ReportKind::RateLimit,
        Scope::new(Waf::Bc, day(21)),
        dir.path(),
    );

    let summary = loader.run().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.executed, 1);
    assert_eq!(backend.submissions(), 2);
    assert_eq!(backend.cancellations(), 1);

    let out_dir = loader.out_dir();
    assert!(out_dir.join("ips-blocked-by-rate-limit.csv").exists());
    assert!(!out_dir.join("user-agents-blocked-by-rate-limit.csv").exists());
    assert!(!out_dir.join("fastest-ips-not-black-or-whitelisted.sql").exists());
}

#[tokio::test]
async fn test_printer_reads_loaded_days() {
    let dir = tempfile::tempdir().unwrap();

    for (d, rate) in [(21, 120), (19, 40), (20, 80)] {
        let backend = Arc::new(rate_limit_backend(rate));
        ReportLoader::new(
            executor(backend, CancellationToken::new(), SharedBuf::default()),
            ReportKind::RateLimit,
            Scope::new(Waf::Bc, day(d)),
            dir.path(),
        )
        .run()
        .await
        .unwrap();
    }

    let printer = RateLimitReportPrinter::new(Waf::Bc, dir.path());
    assert_eq!(
        printer.trend().unwrap(),
        vec![
            ("2023-02-19".to_string(), 40),
            ("2023-02-20".to_string(), 80),
            ("2023-02-21".to_string(), 120),
        ]
    );

    let mut out = Vec::new();
    printer.print(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("2023-02-19: 40\n2023-02-20: 80\n2023-02-21: 120\n"));
    assert!(text.lines().count() > 3);

    // Another WAF has no data.
    let ecp = RateLimitReportPrinter::new(Waf::Ecp, dir.path());
    assert!(ecp.trend().is_err());
}
