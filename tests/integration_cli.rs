// Non-interactive entry points of the binary: `--stats` and `export`.
// HOME points at a scratch directory so no real config or log is touched.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use chrono::Local;
use tempfile::tempdir;

use kata::recorder::KeyDelta;
use kata::{Session, StatsDb};

fn seed(path: &Path) {
    let mut db = StatsDb::open(path).unwrap();
    let now = Local::now();
    let session = Session {
        id: None,
        text: "if err != nil".into(),
        wpm: 52.5,
        accuracy: 92.3,
        duration_secs: 6.1,
        error_count: 1,
        timestamp: now,
    };
    db.record_session_batch(
        &session,
        &[(' ', KeyDelta { errors: 3, successes: 7 })],
        now,
        |stat, _| stat.interval = 1,
    )
    .unwrap();
}

fn kata(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kata").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"));
    cmd
}

#[test]
fn export_csv_writes_header_and_rows() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("kata.db");
    let out = dir.path().join("out.csv");
    seed(&db);

    let output = kata(dir.path())
        .arg("--db")
        .arg(&db)
        .args(["export", "csv"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("exported statistics"));

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "ID,Timestamp,WPM,Accuracy,Duration,ErrorCount");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with(",52.50,92.30,6.10,1"));
}

#[test]
fn export_json_includes_key_statistics() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("kata.db");
    let out = dir.path().join("out.json");
    seed(&db);

    let output = kata(dir.path())
        .arg("--db")
        .arg(&db)
        .args(["export", "json"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["key_statistics"][0]["key"], " ");
    assert_eq!(value["sessions"][0]["error_count"], 1);
}

#[test]
fn stats_summary_prints_sessions_and_weak_keys() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("kata.db");
    seed(&db);

    let output = kata(dir.path())
        .arg("--db")
        .arg(&db)
        .arg("--stats")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("average wpm:   52.5"));
    assert!(stdout.contains("recent sessions:"));
    assert!(stdout.contains("␣"));
    assert!(stdout.contains("30.0% miss"));
    assert!(stdout.contains("keys due for review: 0"));
}

#[test]
fn interactive_mode_requires_a_tty() {
    let dir = tempdir().unwrap();

    let output = kata(dir.path())
        .arg("--db")
        .arg(dir.path().join("kata.db"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("stdin must be a tty"));
}

#[test]
fn unknown_language_lists_bundled_corpora() {
    let dir = tempdir().unwrap();

    let output = kata(dir.path())
        .arg("--db")
        .arg(dir.path().join("kata.db"))
        .args(["-l", "cobol"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cobol"), "{stderr}");
    assert!(stderr.contains("available: go, rust"), "{stderr}");
}

#[test]
fn unknown_theme_is_rejected_before_the_tty_check() {
    let dir = tempdir().unwrap();

    let output = kata(dir.path()).args(["--theme", "solarized"]).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown theme `solarized`"), "{stderr}");
}

#[test]
fn rejects_unknown_subcommand_values() {
    let dir = tempdir().unwrap();

    let output = kata(dir.path()).args(["practice", "poetry"]).output().unwrap();
    assert!(!output.status.success());

    let output = kata(dir.path()).args(["export", "xml", "x.xml"]).output().unwrap();
    assert!(!output.status.success());
}
