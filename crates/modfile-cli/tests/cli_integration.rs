//! CLI subprocess integration tests.
//!
//! These tests invoke the `modfile` binary as a subprocess and verify exit
//! codes, stdout content, and JSON output.

use std::path::{Path, PathBuf};
use std::process::Command;

fn modfile_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modfile"))
}

fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("module.toml");
    std::fs::write(&path, content).unwrap();
    path
}

const VALID: &str = r#"module = "example.com/app@v1"

[language]
version = "v0.9.0"

[deps."example.com/lib@v1"]
v = "v1.4.0"
default = true
"#;

#[test]
fn cli_version_exits_zero() {
    let output = modfile_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "modfile --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("modfile"), "version output: {stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let output = modfile_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("check"));
    assert!(stdout.contains("fmt"));
    assert!(stdout.contains("schema"));
}

#[test]
fn cli_check_valid_manifest_json() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), VALID);

    let output = modfile_bin()
        .args(["--json", "check", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "check must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["module"], "example.com/app@v1");
    assert_eq!(json["schema_version"], "v0.9.0-alpha.0");
    assert_eq!(json["deps"][0]["version"], "v1.4.0");
    assert_eq!(json["default_major_versions"]["example.com/lib"], "v1");
}

#[test]
fn cli_check_strict_rejects_missing_major_version() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "module = \"example.com/app\"\nlanguage.version = \"v0.9.0\"\n",
    );

    let output = modfile_bin()
        .args(["check", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not contain major version"), "{stderr}");

    let output = modfile_bin()
        .args(["--json", "check", "--lax", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["module"], "example.com/app@v0");
}

#[test]
fn cli_check_legacy_reads_module_only() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "module = \"m.com/x@v1\"\nanything = true\n");

    let output = modfile_bin()
        .args(["--json", "check", "--legacy", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["module"], "m.com/x@v1");
    assert_eq!(json["schema_version"], "v0.0.0");
    assert!(json["default_major_versions"].is_null());
}

#[test]
fn cli_check_missing_file_is_manifest_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = modfile_bin()
        .args(["check", &dir.path().join("nope.toml").to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_fmt_rewrites_and_then_reports_formatted() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "language = { version = \"v0.9.0\" }\nmodule = \"example.com/app@v1\"\n",
    );

    let output = modfile_bin()
        .args(["fmt", "--check", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "unformatted file must fail --check");

    let output = modfile_bin()
        .args(["fmt", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "fmt must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(&manifest).unwrap();
    assert!(content.starts_with("module = \"example.com/app@v1\"\n"));

    let output = modfile_bin()
        .args(["fmt", "--check", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success(), "formatted file must pass --check");
}

#[test]
fn cli_schema_json_lists_versions() {
    let output = modfile_bin().args(["--json", "schema"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["earliest"], "v0.0.0");
    assert_eq!(json["earliest_closed"], "v0.8.0-alpha.0");
    assert_eq!(json["versions"].as_array().unwrap().len(), 3);
}
