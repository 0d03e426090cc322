use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const FEED: &str = r#"{"eventType":"START","eventData":{},"url":"http://www.google.com/","timestamp":1444002262091}
{"eventType":"START","eventData":{},"url":"http://aron.ahmadia.net/","timestamp":1444002262095}
not json
{"eventType":"END","eventData":{"status":"success"},"url":"http://www.google.com/","timestamp":1444002262604}
{"eventType":"END","eventData":{"status":"success"},"url":"http://never.started/","timestamp":1444002262605}
"#;

/// Runs the binary against a throwaway config path so a developer's own
/// configuration never leaks into the assertions.
fn crawltrail(dir: &TempDir) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("crawltrail");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("CRAWLTRAIL_WINDOW_SIZE")
        .env_remove("CRAWLTRAIL_BATCH_CEILING")
        .env_remove("CRAWLTRAIL_POLL_INTERVAL_MS")
        .env_remove("CRAWLTRAIL_PULL_TIMEOUT_MS")
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .args(["--log-level", "warn"]);
    cmd
}

fn write_feed(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("feed.jsonl");
    fs::write(&path, FEED).unwrap();
    path
}

fn snapshot_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn replay_draws_one_snapshot_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let feed = write_feed(dir.path());

    let assert = crawltrail(&dir)
        .args(["replay", "--format", "jsonl"])
        .arg(&feed)
        .assert()
        .success();

    let lines = snapshot_lines(&assert.get_output().stdout);
    assert_eq!(lines.len(), 1);
    let snapshot = &lines[0];
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["segments"][0]["key"], "aron.ahmadia.net/");
    assert_eq!(snapshot["segments"][1]["key"], "www.google.com/");
    assert_eq!(snapshot["markers"].as_array().unwrap().len(), 1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("1 rejected"));
    assert!(stderr.contains("1 orphan ends"));
}

#[test]
fn replay_honours_window_size_flag() {
    let dir = tempfile::tempdir().unwrap();
    let feed = write_feed(dir.path());

    let assert = crawltrail(&dir)
        .args(["replay", "--format", "jsonl", "--window-size", "1"])
        .arg(&feed)
        .assert()
        .success();

    let lines = snapshot_lines(&assert.get_output().stdout);
    assert_eq!(lines[0]["segments"].as_array().unwrap().len(), 1);
}

#[test]
fn one_shot_watch_stops_at_end_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let feed = write_feed(dir.path());

    let assert = crawltrail(&dir)
        .args(["watch", "--format", "jsonl", "--poll-interval", "20ms", "--pull-timeout", "20ms"])
        .arg("--source")
        .arg(&feed)
        .assert()
        .success();

    let lines = snapshot_lines(&assert.get_output().stdout);
    assert!(!lines.is_empty());
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("JobFinished"));
    assert!(stderr.contains("5 messages"));
}

#[test]
fn demo_finishes_with_both_fetches_closed() {
    let dir = tempfile::tempdir().unwrap();

    let assert = crawltrail(&dir)
        .args(["demo", "--format", "jsonl", "--interval", "20ms"])
        .assert()
        .success();

    let lines = snapshot_lines(&assert.get_output().stdout);
    let last = lines.last().unwrap();
    assert_eq!(last["closed_total"], 2);
    assert_eq!(last["markers"].as_array().unwrap().len(), 2);
}

#[test]
fn config_show_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let assert = crawltrail(&dir).args(["config", "show"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("window_size: 25"));
    assert!(stdout.contains("batch_ceiling: 250"));
}

#[test]
fn config_get_reads_env_override() {
    let dir = tempfile::tempdir().unwrap();

    let assert = crawltrail(&dir)
        .env("CRAWLTRAIL_BATCH_CEILING", "40")
        .args(["config", "get", "trail.batch_ceiling"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert_eq!(stdout.trim(), "40");
}

#[test]
fn unreachable_tcp_feed_fails() {
    let dir = tempfile::tempdir().unwrap();

    crawltrail(&dir)
        .args(["watch", "--source", "tcp://127.0.0.1:1"])
        .assert()
        .failure();
}
