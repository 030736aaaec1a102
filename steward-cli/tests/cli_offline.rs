//! Black-box CLI tests for every path that completes without a directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn steward_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("steward"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("STEWARD_ENDPOINT")
        .env_remove("STEWARD_LOG");
    cmd
}

fn write_manifest(home: &TempDir, body: &str) -> PathBuf {
    let path = home.path().join("alice.yaml");
    fs::write(&path, body).expect("write manifest");
    path
}

const MANIFEST: &str = "pool_id: eu-west-1_Pool1\nusername: alice\ngroups: [readers, admins]\n";

#[test]
fn status_with_no_state() {
    let home = TempDir::new().expect("home");
    steward_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No users tracked."));
}

#[test]
fn status_json_is_parseable() {
    let home = TempDir::new().expect("home");
    let output = steward_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["summary"]["tracked"], 0);
}

#[test]
fn plan_for_new_user_lists_create_and_groups() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(&home, MANIFEST);
    steward_cmd(home.path())
        .arg("plan")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(contains("create user eu-west-1_Pool1/alice"))
        .stdout(contains("add to group admins"))
        .stdout(contains("add to group readers"));
}

#[test]
fn plan_warns_when_user_will_be_recreated() {
    let home = TempDir::new().expect("home");
    let applied = steward_core::DesiredState::new("eu-west-1_Pool1".into(), "alice".into());
    let doc = steward_sync::StateDocument {
        identity: applied.identity(),
        applied,
        manifest_sha256: "stale".into(),
        manifest_path: None,
        applied_at: chrono::Utc::now(),
        observed: None,
    };
    steward_sync::store::save_at(home.path(), "alice", &doc).expect("seed state");

    let manifest = write_manifest(&home, "pool_id: eu-west-1_Pool2\nusername: alice\n");
    steward_cmd(home.path())
        .arg("plan")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(contains("will be deleted and recreated"))
        .stdout(contains("replace eu-west-1_Pool1/alice with eu-west-1_Pool2/alice"));
}

#[test]
fn apply_dry_run_needs_no_endpoint() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(&home, MANIFEST);
    steward_cmd(home.path())
        .arg("apply")
        .arg("alice")
        .arg(&manifest)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"));
    assert!(!home.path().join(".steward/state/alice.json").exists());
}

#[test]
fn apply_with_both_passwords_fails_before_connecting() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(
        &home,
        "pool_id: eu-west-1_Pool1\nusername: alice\n\
         temporary_password: Temp-Pass-1\npermanent_password: Perm-Pass-1\n",
    );
    // An unreachable endpoint proves no request was attempted.
    steward_cmd(home.path())
        .args(["--endpoint", "http://127.0.0.1:9"])
        .arg("apply")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("mutually exclusive"))
        .stderr(contains("transport").not());
}

#[test]
fn apply_without_endpoint_explains_configuration() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(&home, MANIFEST);
    steward_cmd(home.path())
        .arg("apply")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("no directory endpoint configured"));
}

#[test]
fn import_rejects_malformed_id() {
    let home = TempDir::new().expect("home");
    steward_cmd(home.path())
        .args(["import", "alice", "bad"])
        .assert()
        .failure()
        .stderr(contains("expected <pool_id>/<username>"));
}

#[test]
fn destroy_untracked_is_a_noop() {
    let home = TempDir::new().expect("home");
    steward_cmd(home.path())
        .args(["destroy", "ghost"])
        .assert()
        .success()
        .stdout(contains("nothing to destroy"));
}

#[test]
fn diff_untracked_shows_declared_lines_as_additions() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(&home, MANIFEST);
    steward_cmd(home.path())
        .arg("diff")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(contains("+group admins"))
        .stdout(contains("+group readers"));
}

#[test]
fn invalid_manifest_field_is_reported() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(&home, "pool_id: not-a-pool\nusername: alice\n");
    steward_cmd(home.path())
        .arg("plan")
        .arg("alice")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(contains("pool_id"));
}
