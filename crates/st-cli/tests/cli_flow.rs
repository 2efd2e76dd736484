//! End-to-end tests driving the `st` binary.
//!
//! Each test gets its own HOME and database so user configuration never leaks in.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn st_binary() -> String {
    env!("CARGO_BIN_EXE_st").to_string()
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/lab.json")
}

fn st(temp: &Path, args: &[&str]) -> Output {
    Command::new(st_binary())
        .env("HOME", temp)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("RUST_LOG")
        .env("ST_DATABASE_PATH", temp.join("standing.db"))
        .args(args)
        .output()
        .expect("failed to run st")
}

fn st_ok(temp: &Path, args: &[&str]) -> String {
    let output = st(temp, args);
    assert!(
        output.status.success(),
        "st {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn imported() -> TempDir {
    let temp = TempDir::new().unwrap();
    let fixture = fixture();
    st_ok(temp.path(), &["import", fixture.to_str().unwrap()]);
    temp
}

#[test]
fn test_init_creates_database() {
    let temp = TempDir::new().unwrap();
    let stdout = st_ok(temp.path(), &["init"]);
    assert!(stdout.starts_with("Database ready: "));
    assert!(temp.path().join("standing.db").exists());
}

#[test]
fn test_import_then_summary_json() {
    let temp = imported();
    let stdout = st_ok(temp.path(), &["summary", "v1", "--json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(summary["totalStudents"], 4);
    assert_eq!(summary["totalStandings"], 8);
    assert_eq!(summary["cleared"], 3);
    assert_eq!(summary["notCleared"], 2);
    assert_eq!(summary["ongoing"], 1);
    assert_eq!(summary["notAttempted"], 2);
    assert_eq!(summary["completionRate"], 0.375);
}

#[test]
fn test_import_from_stdin_is_idempotent() {
    let temp = imported();
    let mut child = Command::new(st_binary())
        .env("HOME", temp.path())
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env("ST_DATABASE_PATH", temp.path().join("standing.db"))
        .args(["import", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(std::fs::read(fixture()).unwrap().as_slice())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("attempts:  0"));
    assert!(stdout.contains("marks:     5"));

    let venues = st_ok(temp.path(), &["venues"]);
    assert_eq!(venues.lines().count(), 2);
}

#[test]
fn test_attendance_with_fixed_clock() {
    let temp = imported();
    let stdout = st_ok(
        temp.path(),
        &[
            "attendance", "v1", "--date", "2025-03-10", "--session", "Forenoon", "--at",
            "2025-03-10T09:00",
        ],
    );
    assert!(stdout.contains("State: Ongoing"));
    assert!(stdout.contains("Present: 1  Absent: 1  Late: 1  PS: 0  Unmarked: 1"));

    let before = st_ok(
        temp.path(),
        &[
            "attendance", "v1", "--date", "2025-03-10", "--session", "fn", "--at",
            "2025-03-10T08:59", "--json",
        ],
    );
    let detail: serde_json::Value = serde_json::from_str(&before).unwrap();
    assert_eq!(detail["sessionState"], "NotStarted");
    assert_eq!(detail["students"][3]["status"], serde_json::Value::Null);
}

#[test]
fn test_students_filters_and_pages() {
    let temp = imported();
    let stdout = st_ok(
        temp.path(),
        &[
            "students", "v1", "--group", "g2", "--sort-by", "score", "--order", "desc", "--json",
        ],
    );
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let scores: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["bestScore"].clone())
        .collect();
    assert_eq!(
        scores,
        vec![
            serde_json::json!(90),
            serde_json::json!(81),
            serde_json::json!(68),
            serde_json::Value::Null,
        ]
    );
}

#[test]
fn test_config_file_sets_page_limit() {
    let temp = imported();
    let config = temp.path().join("st.toml");
    std::fs::write(&config, "default_page_limit = 3\n").unwrap();
    let stdout = st_ok(
        temp.path(),
        &["--config", config.to_str().unwrap(), "students", "v1", "--json"],
    );
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["pagination"]["limit"], 3);
    assert_eq!(page["pagination"]["totalPages"], 3);
}

#[test]
fn test_unknown_venue_fails() {
    let temp = imported();
    let output = st(temp.path(), &["summary", "nowhere"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load venue nowhere"));
    assert!(stderr.contains("unknown venue: nowhere"));
}

#[test]
fn test_bad_at_value_fails() {
    let temp = imported();
    let output = st(
        temp.path(),
        &["sessions", "v1", "--at", "noon"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid time: noon"));
}
