//! End-to-end tests for the apilevels binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/api-versions.xml")
}

fn apilevels() -> Command {
    let mut cmd = Command::cargo_bin("apilevels").unwrap();
    cmd.arg("--xml").arg(fixture()).arg("--platform").arg("34");
    cmd
}

#[test]
fn test_class_lookup() {
    apilevels()
        .args(["class", "android.app.Activity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("android.app.Activity"))
        .stdout(predicate::str::contains("API 1"));
}

#[test]
fn test_unknown_class_fails() {
    apilevels()
        .args(["class", "com.example.Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_method_lookup_with_descriptor() {
    apilevels()
        .args([
            "method",
            "android/app/Activity",
            "getFragmentManager",
            "()Landroid/app/FragmentManager;",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("API 11"))
        .stdout(predicate::str::contains("API 26"))
        .stdout(predicate::str::contains("API 30"));
}

#[test]
fn test_unknown_overload_fails() {
    apilevels()
        .args(["method", "android/app/Activity", "onCreate", "(I)V"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_field_lookup_json() {
    apilevels()
        .args(["--format", "json", "field", "android.os.Build", "SERIAL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"since\": 9"))
        .stdout(predicate::str::contains("\"deprecated_in\": 26"));
}

#[test]
fn test_cast_lookup() {
    apilevels()
        .args(["cast", "android.app.Activity", "android.view.KeyEvent$Callback"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API 9"));
}

#[test]
fn test_removed_listing() {
    apilevels()
        .args(["removed", "android/webkit/WebSettings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("getSaveFormData()"))
        .stdout(predicate::str::contains("removed 33"));
}

#[test]
fn test_compile_then_validate() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");

    apilevels()
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("compile")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled"));

    apilevels()
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_validate_missing_cache() {
    let temp_dir = TempDir::new().unwrap();
    apilevels()
        .arg("--cache-dir")
        .arg(temp_dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"));
}

#[test]
fn test_info_reports_stats() {
    apilevels()
        .args(["--format", "json", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"platform\": 34"))
        .stdout(predicate::str::contains("\"classes\": 13"));
}
