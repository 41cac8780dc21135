//! End-to-end command tests for the gren binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn gren(project: &TempDir, cache: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gren").unwrap();
    cmd.current_dir(project.path());
    cmd.env("GREN_HOME", cache.path());
    cmd
}

#[test]
fn test_init_scaffolds_an_application() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();

    assert!(project.path().join("gren.json").exists());
    assert!(project.path().join("src/Main.gren").exists());

    let outline = fs::read_to_string(project.path().join("gren.json")).unwrap();
    assert!(outline.contains("\"type\": \"application\""));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already"));
}

#[test]
fn test_init_package() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache)
        .args(["init", "--package", "--platform=common"])
        .assert()
        .success();

    let outline = fs::read_to_string(project.path().join("gren.json")).unwrap();
    assert!(outline.contains("\"type\": \"package\""));
    assert!(outline.contains("\"platform\": \"common\""));
}

#[test]
fn test_make_type_check_only() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .args(["make", "src/Main.gren", "--output=/dev/null"])
        .assert()
        .success();

    assert!(project.path().join(".gren/details.dat").exists());
}

#[test]
fn test_make_emits_html() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .args(["make", "src/Main.gren", "--output=out.html"])
        .assert()
        .success();

    let page = fs::read_to_string(project.path().join("out.html")).unwrap();
    assert!(page.contains("Gren['Main']"));
}

#[test]
fn test_make_rejects_debug_with_optimize() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .args(["make", "src/Main.gren", "--debug", "--optimize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--optimize and --debug"));
}

#[test]
fn test_make_json_report() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    let assert = gren(&project, &cache)
        .args(["make", "src/Missing.gren", "--report=json"])
        .assert()
        .failure();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["type"], "compile-errors");
}

#[test]
fn test_make_without_project() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache)
        .args(["make", "src/Main.gren"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gren.json"));
}

#[test]
fn test_install_with_no_dependencies() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("ready"));
}

#[test]
fn test_install_unknown_package() {
    let project = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    gren(&project, &cache).arg("init").assert().success();
    gren(&project, &cache)
        .args(["install", "no/body"])
        .assert()
        .failure();
}
