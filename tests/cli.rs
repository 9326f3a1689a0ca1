//! CLI integration tests against the real binary.
//!
//! These cover everything that fails before the bundle is touched; the
//! embedding engine itself is exercised by the unit tests with fake tools.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

#[allow(deprecated)]
fn deploy_cmd() -> Command {
    let mut cmd = Command::cargo_bin("macruby_deploy").unwrap();
    for var in [
        "TARGET_BUILD_DIR",
        "FULL_PRODUCT_NAME",
        "ARCHS",
        "GEM_HOME",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn bundle(root: &Path) -> PathBuf {
    let app = root.join("Hello.app");
    fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
    fs::create_dir_all(app.join("Contents/Resources")).unwrap();
    fs::write(app.join("Contents/MacOS/Hello"), "not a binary").unwrap();
    fs::write(app.join("Contents/Resources/rb_main.rb"), "puts 'hello'").unwrap();
    app
}

#[test]
fn help_lists_the_flags() {
    deploy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--compile"))
        .stdout(predicate::str::contains("--embed"))
        .stdout(predicate::str::contains("--no-stdlib"))
        .stdout(predicate::str::contains("--gem"));
}

#[test]
fn nothing_to_do() {
    deploy_cmd()
        .arg("Hello.app")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("--compile and/or --embed"));
}

#[test]
fn missing_bundle() {
    deploy_cmd()
        .arg("--embed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: missing required argument"));
}

#[test]
fn bundle_from_build_environment() {
    let tmp = tempfile::tempdir().unwrap();
    deploy_cmd()
        .arg("--embed")
        .env("TARGET_BUILD_DIR", tmp.path())
        .env("FULL_PRODUCT_NAME", "Missing.app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing.app does not exist"));
}

#[test]
fn conflicting_stdlib_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let app = bundle(tmp.path());
    deploy_cmd()
        .args(["--embed", "--no-stdlib", "--stdlib", "json"])
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflicting arguments"));
}

#[test]
fn gem_without_embed() {
    let tmp = tempfile::tempdir().unwrap();
    let app = bundle(tmp.path());
    deploy_cmd()
        .args(["--compile", "--gem", "rack"])
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--gem requires --embed"));
}

#[test]
fn not_an_application_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    deploy_cmd()
        .arg("--embed")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an application bundle"));
}

#[test]
fn unreadable_layout_config() {
    let tmp = tempfile::tempdir().unwrap();
    let app = bundle(tmp.path());
    let config = tmp.path().join("layout.toml");
    fs::write(&config, "no_such_field = true\n").unwrap();
    deploy_cmd()
        .arg("--compile")
        .arg("--config")
        .arg(&config)
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_such_field"));
}

#[test]
fn framework_not_installed() {
    let tmp = tempfile::tempdir().unwrap();
    let app = bundle(tmp.path());
    deploy_cmd()
        .args(["--compile", "--arch", "x86_64", "--framework"])
        .arg(tmp.path().join("MacRuby.framework"))
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no runtime library found"));
    // nothing was compiled or removed
    assert!(app.join("Contents/Resources/rb_main.rb").is_file());
}

#[test]
fn executable_without_architectures() {
    let tmp = tempfile::tempdir().unwrap();
    let app = bundle(tmp.path());
    deploy_cmd()
        .arg("--compile")
        .arg("--framework")
        .arg(tmp.path().join("MacRuby.framework"))
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot determine the architectures"));
}
