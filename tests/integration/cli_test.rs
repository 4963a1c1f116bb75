//! End-to-end tests of the waflogs binary that need no AWS access.

use super::common::run_binary;

#[test]
fn test_report_prints_trend_from_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("data").join("ECP").join("rate-limit-report");
    for (day, rate) in [("2023-02-20", 7), ("2023-02-21", 13)] {
        let day_dir = report.join(day);
        std::fs::create_dir_all(&day_dir).unwrap();
        std::fs::write(
            day_dir.join("fastest-bot-user-agents-not-black-or-whitelisted.csv"),
            format!("bot_name,bot_category,user_agent,total_requests,max_requests_per_5min\nx,y,z,100,{rate}\n"),
        )
        .unwrap();
    }

    let (code, stdout, stderr) = run_binary(
        &[
            "--config",
            "missing.toml",
            "--data-dir",
            "data",
            "report",
            "rate-limit",
            "--waf",
            "ECP",
        ],
        dir.path(),
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.starts_with("2023-02-20: 7\n2023-02-21: 13\n"));
}

#[test]
fn test_report_without_data_fails() {
    let dir = tempfile::tempdir().unwrap();

    let (code, _stdout, stderr) = run_binary(
        &["--config", "missing.toml", "--data-dir", "nothing-here", "report", "rate-limit"],
        dir.path(),
    );

    assert_eq!(code, 1);
    assert!(stderr.contains("printing rate limit report"), "stderr: {stderr}");
}

#[test]
fn test_load_without_output_location_fails_before_aws() {
    let dir = tempfile::tempdir().unwrap();

    let (code, _stdout, stderr) = run_binary(
        &["--config", "missing.toml", "load", "apc1", "-t", "2023-02-21"],
        dir.path(),
    );

    assert_eq!(code, 1);
    assert!(stderr.contains("output_location is not set"), "stderr: {stderr}");
}

#[test]
fn test_unknown_waf_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let (code, _stdout, stderr) = run_binary(&["report", "rate-limit", "-w", "XYZ"], dir.path());

    assert_eq!(code, 2);
    assert!(stderr.contains("WAF XYZ unknown"), "stderr: {stderr}");
}
