//! CLI integration tests for the offline subcommands.
//!
//! Uses `assert_cmd` to spawn the `effeff` binary and verify
//! exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper: create a Command for the `effeff` binary.
fn effeff() -> Command {
    cargo_bin_cmd!("effeff")
}

/// A published form with a required name, an optional email and a 1..10
/// rating.
const FORM_JSON: &str = r#"{
    "id": "form:abc123",
    "title": "Kundenfeedback",
    "slug": "kundenfeedback",
    "status": "published",
    "questions": [
        {"id": "q1", "type": "text", "title": "Name", "position": 0, "required": true},
        {"id": "q2", "type": "email", "title": "E-Mail", "position": 1},
        {"id": "q3", "type": "rating", "title": "Bewertung", "position": 2, "settings": {"max": 10}}
    ]
}"#;

fn write_fixtures(dir: &TempDir, submission: &str) -> (PathBuf, PathBuf) {
    let form = dir.path().join("form.json");
    let sub = dir.path().join("submission.json");
    fs::write(&form, FORM_JSON).unwrap();
    fs::write(&sub, submission).unwrap();
    (form, sub)
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    effeff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Form submission service"));
}

#[test]
fn version_exits_0() {
    effeff()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("effeff"));
}

#[test]
fn serve_help_lists_store_flags() {
    effeff()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--store-url"))
        .stdout(predicate::str::contains("SURREAL_URL"))
        .stdout(predicate::str::contains("--rate-limit"));
}

// ──────────────────────────────────────────────
// 2. Validate subcommand
// ──────────────────────────────────────────────

#[test]
fn validate_valid_submission_exits_0() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(
        &dir,
        r#"{"answers": [
            {"question_id": "q1", "value": "Erika"},
            {"question_id": "q2", "value": "erika@example.com"},
            {"question_id": "q3", "value": 9}
        ]}"#,
    );
    effeff()
        .arg("validate")
        .arg(&form)
        .arg(&sub)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn validate_invalid_submission_exits_1_with_errors() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(
        &dir,
        r#"{"answers": [
            {"question_id": "q2", "value": "user@@example.com"},
            {"question_id": "q3", "value": 11}
        ]}"#,
    );
    effeff()
        .arg("validate")
        .arg(&form)
        .arg(&sub)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid submission"))
        .stderr(predicate::str::contains("q1: 'Name' ist ein Pflichtfeld"))
        .stderr(predicate::str::contains("q2: Ungültige E-Mail-Adresse"))
        .stderr(predicate::str::contains(
            "q3: Bewertung muss zwischen 1 und 10 liegen",
        ));
}

#[test]
fn validate_json_output_reports_error_map() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(&dir, r#"{"answers": []}"#);
    let output = effeff()
        .args(["--output", "json", "validate"])
        .arg(&form)
        .arg(&sub)
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stderr
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("JSON on stderr");
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"]["q1"], "'Name' ist ein Pflichtfeld");
    assert_eq!(json["errors"].as_object().unwrap().len(), 1);
}

#[test]
fn validate_json_output_valid() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(
        &dir,
        r#"{"answers": [{"question_id": "q1", "value": "Erika"}]}"#,
    );
    effeff()
        .args(["--output", "json", "validate"])
        .arg(&form)
        .arg(&sub)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn validate_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let (form, _) = write_fixtures(&dir, "{}");
    effeff()
        .arg("validate")
        .arg(&form)
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn validate_malformed_json_exits_1() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(&dir, "{\"answers\": [");
    effeff()
        .arg("validate")
        .arg(&form)
        .arg(&sub)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error parsing JSON"));
}

#[test]
fn validate_quiet_suppresses_output() {
    let dir = TempDir::new().unwrap();
    let (form, sub) = write_fixtures(&dir, r#"{"answers": []}"#);
    effeff()
        .args(["--quiet", "validate"])
        .arg(&form)
        .arg(&sub)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}
