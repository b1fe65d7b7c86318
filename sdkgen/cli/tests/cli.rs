use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn sdkgen_cmd() -> Command {
    Command::cargo_bin("sdkgen").unwrap()
}

/// A scratch copy of the fixture Go project shared with the library tests.
fn shop() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("lib/tests/fixtures/shop");
    copy_tree(&fixture, temp_dir.path());
    temp_dir
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

#[test]
fn test_help_flag() {
    sdkgen_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("client SDKs"));
}

#[test]
fn test_version_flag() {
    sdkgen_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sdkgen"));
}

#[test]
fn test_generate_help_lists_outputs() {
    sdkgen_cmd()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--go-out"))
        .stdout(predicate::str::contains("--php-out"))
        .stdout(predicate::str::contains("--dry-run"));
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn test_generate_without_selection_is_a_usage_error() {
    let temp_dir = shop();
    sdkgen_cmd()
        .args(["generate", "--root"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--all"));
}

#[test]
fn test_generate_all_writes_go_sdk() {
    let temp_dir = shop();
    let root = temp_dir.path();

    sdkgen_cmd()
        .args(["generate", "--all", "--root"])
        .arg(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("file(s) for 2 resource(s)"));

    assert!(root.join("sdk/shop/widget/widget_spec.go").is_file());
    assert!(root.join("sdk/shop/client.go").is_file());
}

#[test]
fn test_generate_json_summary() {
    let temp_dir = shop();
    let root = temp_dir.path();

    let output = sdkgen_cmd()
        .args(["generate", "--all", "--json", "--root"])
        .arg(root)
        .arg("--php-out")
        .arg(root.join("php"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["mode"], "local");
    assert_eq!(summary["resources"], serde_json::json!(["Order", "Widget"]));
    assert!(root.join("php/ClientFactory.php").is_file());
}

#[test]
fn test_generate_dry_run_prints_files() {
    let temp_dir = shop();
    let root = temp_dir.path();

    sdkgen_cmd()
        .args(["generate", "api/typespec/widgettype/widget.go", "--dry-run", "--root"])
        .arg(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("widget_spec.go ==="))
        .stdout(predicate::str::contains("// Code generated by sdkgen. DO NOT EDIT."))
        .stdout(predicate::str::contains("Would write"));

    assert!(!root.join("sdk").exists());
}

#[test]
fn test_generate_reports_forbidden_import() {
    let temp_dir = shop();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("api/typespec/carttype")).unwrap();
    fs::write(
        root.join("api/typespec/carttype/cart.go"),
        "package carttype\n\nimport \"example.com/shop/internal/db\"\n\ntype Cart struct {\n\tID int64\n}\n",
    )
    .unwrap();

    sdkgen_cmd()
        .args(["generate", "--all", "--root"])
        .arg(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cart.go:3"))
        .stderr(predicate::str::contains("not a whitelisted package"));

    assert!(!root.join("sdk").exists());
}

#[test]
fn test_generate_rejects_unknown_mode() {
    let temp_dir = shop();
    sdkgen_cmd()
        .args(["generate", "--all", "--mode", "remote", "--root"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("remote"));
}

// ============================================================================
// logging
// ============================================================================

#[test]
fn test_rust_log_enables_logging_without_verbose() {
    let temp_dir = shop();
    sdkgen_cmd()
        .env("RUST_LOG", "sdkgen_lib=debug")
        .args(["inspect", "api/typespec/widgettype/widget.go", "--root"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("extracted type file"));
}

#[test]
fn test_quiet_by_default() {
    let temp_dir = shop();
    sdkgen_cmd()
        .env_remove("RUST_LOG")
        .args(["inspect", "api/typespec/widgettype/widget.go", "--root"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn test_inspect_pretty() {
    let temp_dir = shop();
    sdkgen_cmd()
        .args(["inspect", "api/typespec/widgettype/widget.go", "--root"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget"))
        .stdout(predicate::str::contains("StatusLive"))
        .stdout(predicate::str::contains("GET /widget/info"));
}

#[test]
fn test_inspect_json() {
    let temp_dir = shop();
    let output = sdkgen_cmd()
        .args(["inspect", "api/typespec/ordertype/order.go", "--json", "--root"])
        .arg(temp_dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let model: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(model["resource"], "Order");
    assert_eq!(model["pairs"][0]["action"], "ListOrder");
    assert_eq!(model["pairs"][0]["route"]["method"], "GET");
}

// ============================================================================
// completions
// ============================================================================

#[test]
fn test_completions_bash() {
    sdkgen_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sdkgen"));
}
