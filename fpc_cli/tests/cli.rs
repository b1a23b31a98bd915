//! Integration tests for the `fpc` binary.
//!
//! The binary is run against the feed fixture of `fpc_core`, so no network is needed.

use std::{
    path::PathBuf,
    process::{Command, Output},
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fpc_core")
        .join("src")
        .join("feed_client")
        .join("tests")
        .join("rss_test.xml")
}

fn run_fpc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fpc"))
        .args(args)
        .env_remove("FPC_FEED_URL")
        .output()
        .unwrap()
}

#[test]
fn test_calendar_on_stdout_and_logs_on_stderr() {
    let feed = fixture();
    let output = run_fpc(&["--feed-url", feed.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stdout.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(stdout.ends_with("END:VCALENDAR\r\n"));
    assert_eq!(stdout.matches("BEGIN:VEVENT").count(), 6);
    assert!(stderr.contains("Generated calendar with 6 events"));
    assert!(!stdout.contains("Generated calendar"));
    assert!(!stderr.contains("BEGIN:VCALENDAR"));
}

#[test]
fn test_log_level_error_keeps_stderr_quiet() {
    let feed = fixture();
    let output = run_fpc(&["--feed-url", feed.to_str().unwrap(), "--log-level", "error"]);
    assert!(output.status.success());
    assert!(output.stderr.is_empty());
    assert!(!output.stdout.is_empty());
}

#[test]
fn test_missing_feed_fails_without_output() {
    let output = run_fpc(&["--feed-url", "does/not/exist.xml"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to read feed from does/not/exist.xml"));
}

#[test]
fn test_unknown_timezone_fails() {
    let feed = fixture();
    let output = run_fpc(&["--feed-url", feed.to_str().unwrap(), "--timezone", "Mars/Olympus"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown timezone Mars/Olympus"));
}

#[test]
fn test_check_report_on_stdout() {
    let feed = fixture();
    let output = run_fpc(&["--feed-url", feed.to_str().unwrap(), "check"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Total entries in feed: 14"));
    assert!(stdout.contains("Successfully parsed presales: 6"));
    assert!(!stdout.contains("BEGIN:VCALENDAR"));
}
