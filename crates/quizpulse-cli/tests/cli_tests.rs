//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quizpulse() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("quizpulse").unwrap();
    cmd.env_remove("QUIZPULSE_COMPARISON_WINDOW_DAYS");
    cmd
}

const SUBMISSION: &str = r#"{
  "account_id": "acc-1",
  "child_index": "0",
  "quiz": { "id": "fractions-1", "question_count": 3, "subject": "math" },
  "start_time": "2025-08-18T09:00:00Z",
  "end_time": "2025-08-18T09:01:30Z",
  "correct": [1, 1, 0],
  "hint_count": [0, 1, 0],
  "wrong_count": [0, 0, 2]
}"#;

fn attempt(quiz: &str, subject: &str, start: &str, end: &str, correct: &[bool], score: f64, outcome: &str) -> String {
    let questions: Vec<String> = correct
        .iter()
        .map(|c| format!(r#"{{ "correct": {c} }}"#))
        .collect();
    format!(
        r#"{{
    "account_id": "acc-1",
    "child_index": "0",
    "quiz_id": "{quiz}",
    "subject": "{subject}",
    "start_time": "{start}",
    "end_time": "{end}",
    "questions": [{}],
    "score": {score},
    "outcome": "{outcome}"
  }}"#,
        questions.join(", ")
    )
}

/// One learner, two weeks: 2025-W33 (one abandoned attempt) and 2025-W34
/// (three completed attempts).
fn store_json() -> String {
    // 2 questions answered correctly in 240 s: speed 1 - (120-15)/345
    let slow = 0.8 + 0.2 * (1.0 - 105.0 / 345.0);
    let records = [
        attempt("q1", "math", "2025-08-12T09:00:00Z", "2025-08-12T09:04:00Z", &[true, false], 0.8 * 0.5 + 0.2 * (1.0 - 225.0 / 345.0), "abandoned"),
        attempt("q1", "math", "2025-08-18T09:00:00Z", "2025-08-18T09:04:00Z", &[true, true], slow, "completed"),
        attempt("q2", "art", "2025-08-19T09:00:00Z", "2025-08-19T09:04:00Z", &[true, true], slow, "completed"),
        attempt("q3", "science", "2025-08-20T09:00:00Z", "2025-08-20T09:04:00Z", &[true, true], slow, "completed"),
    ];
    format!("[\n  {}\n]", records.join(",\n  "))
}

fn write_store(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("attempts.json");
    std::fs::write(&path, store_json()).unwrap();
    path
}

#[test]
fn score_prints_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("submission.json");
    std::fs::write(&path, SUBMISSION).unwrap();

    quizpulse()
        .arg("score")
        .arg("--submission")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"abandoned\""))
        .stdout(predicate::str::contains("\"score\": 0.58"));
}

#[test]
fn score_rejects_mismatched_arrays() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("submission.json");
    std::fs::write(&path, SUBMISSION.replace("[0, 0, 2]", "[0, 2]")).unwrap();

    quizpulse()
        .arg("score")
        .arg("--submission")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("per-question arrays must have 3 entries"));
}

#[test]
fn weekly_text_report() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("acc-1/0 (2025-W34): 3 attempt(s)"))
        .stdout(predicate::str::contains("science"))
        .stdout(predicate::str::contains("[engagement medium] Good regularity: 3 of 7 days."));
}

#[test]
fn fail_on_alerts_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--fail-on-alerts")
        .assert()
        .success();

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("2025-W35")
        .arg("--fail-on-alerts")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("No quizzes in the last 7 days"));
}

#[test]
fn json_report_to_file() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);
    let out = dir.path().join("out").join("report.json");

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("2025-W34")
        .arg("--format")
        .arg("json")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Report saved to"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["period"]["key"], "2025-W34");
    assert_eq!(report["snapshot"]["total_attempts"], 3);
    assert_eq!(report["snapshot"]["completion"]["completed"], 3);
    let categories: Vec<&str> = report["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"diversity"));
    assert!(categories.contains(&"records"));
}

#[test]
fn markdown_report_for_quiet_week() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("2025-W35")
        .arg("--format")
        .arg("markdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("### Alerts"))
        .stdout(predicate::str::contains("No quizzes in the last 7 days"));
}

#[test]
fn config_changes_comparison_window() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);
    let config = dir.path().join("quizpulse.toml");
    std::fs::write(&config, "[metrics]\ncomparison_window_days = 14\n").unwrap();

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("2025-W36")
        .arg("--format")
        .arg("json")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("no_recent_activity"));
}

#[test]
fn report_rejects_bad_period() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("monthly")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown period mode"));

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--period")
        .arg("2025-34")
        .assert()
        .failure();
}

#[test]
fn report_rejects_zero_comparison_window() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);
    let config = dir.path().join("quizpulse.toml");
    std::fs::write(&config, "[metrics]\ncomparison_window_days = 0\n").unwrap();

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("comparison_window_days must be between"));
}

#[test]
fn report_rejects_missing_config() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("report")
        .arg("--attempts")
        .arg(&store)
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn weeks_table() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("weeks")
        .arg("--attempts")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-W33"))
        .stdout(predicate::str::contains("2025-W34"));
}

#[test]
fn validate_clean_store() {
    let dir = TempDir::new().unwrap();
    let store = write_store(&dir);

    quizpulse()
        .arg("validate")
        .arg("--attempts")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 records"))
        .stdout(predicate::str::contains("All records valid"));
}

#[test]
fn validate_reports_drift() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("attempts.json");
    std::fs::write(&path, store_json().replacen("\"completed\"", "\"failed\"", 1)).unwrap();

    quizpulse()
        .arg("validate")
        .arg("--attempts")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("stored outcome failed differs"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    quizpulse()
        .arg("validate")
        .arg("--attempts")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn rescore_writes_corrected_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("attempts.json");
    std::fs::write(&path, store_json().replacen("\"completed\"", "\"failed\"", 1)).unwrap();
    let out = dir.path().join("rescored.json");

    quizpulse()
        .arg("rescore")
        .arg("--attempts")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Rescored 4 record(s)"));

    quizpulse()
        .arg("validate")
        .arg("--attempts")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("All records valid"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    quizpulse()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizpulse.toml"))
        .stdout(predicate::str::contains("Created attempts/example.json"));

    assert!(dir.path().join("quizpulse.toml").exists());
    assert!(dir.path().join("attempts/example.json").exists());

    quizpulse()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--attempts")
        .arg("attempts")
        .assert()
        .success()
        .stdout(predicate::str::contains("All records valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    quizpulse()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // Second init should skip
    quizpulse()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    quizpulse()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Quiz attempt scoring and progress analytics"));
}

#[test]
fn version_output() {
    quizpulse()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizpulse"));
}
