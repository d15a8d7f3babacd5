use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

/// `dealsync` with no ambient configuration: B24_* unset and the config
/// directory pointed at an empty temp dir.
fn dealsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dealsync"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("B24_ID")
        .env_remove("B24_KEY")
        .env("RUST_LOG", "off");
    cmd
}

fn write_submission(dir: &Path, delivery_code: &str) -> std::path::PathBuf {
    let path = dir.join("order.json");
    let body = serde_json::json!({
        "title": "Order 1",
        "client": { "name": "Ivan", "phone": "79990000000" },
        "products": ["Chair", "Table"],
        "delivery_adress": "Main St 1",
        "delivery_date": "2024-01-01",
        "delivery_code": delivery_code
    });
    fs::write(&path, body.to_string()).expect("write submission");
    path
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().expect("home");
    dealsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("serve"))
        .stdout(contains("fields"))
        .stdout(contains("submit"))
        .stdout(contains("lookup"));
}

#[test]
fn in_memory_submit_prints_result_envelope() {
    let home = TempDir::new().expect("home");
    let file = write_submission(home.path(), "AAABBBCCCDDD");

    let assert = dealsync_cmd(home.path())
        .args(["submit", "--in-memory"])
        .arg(&file)
        .assert()
        .success()
        .stderr(contains("new contact, new deal"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let result: Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(result["disposition"], "new_contact_new_deal");
    assert_eq!(result["deal"]["ok"]["products"], "Chair, Table");
    assert_eq!(result["deal"]["ok"]["delivery_code"], "AAABBBCCCDDD");
}

#[test]
fn invalid_submission_is_rejected_before_any_crm_call() {
    let home = TempDir::new().expect("home");
    let file = write_submission(home.path(), "SHORT");

    dealsync_cmd(home.path())
        .args(["submit", "--in-memory"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("invalid submission"))
        .stderr(contains("delivery code"))
        .stderr(contains("in-memory CRM").not());
}

#[test]
fn missing_configuration_names_the_variables() {
    let home = TempDir::new().expect("home");

    dealsync_cmd(home.path())
        .arg("fields")
        .assert()
        .failure()
        .stderr(contains("B24_ID"))
        .stderr(contains("B24_KEY"));
}

#[test]
fn malformed_config_file_is_reported() {
    let home = TempDir::new().expect("home");
    let config = home.path().join("config.yaml");
    fs::write(&config, "crm: [not, a, map]\n").expect("write config");

    dealsync_cmd(home.path())
        .args(["fields", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("config.yaml"));
}

#[test]
fn lookup_validates_phone_before_connecting() {
    let home = TempDir::new().expect("home");

    dealsync_cmd(home.path())
        .args(["lookup", "contact", "12-34"])
        .assert()
        .failure()
        .stderr(contains("invalid phone"));
}

#[test]
fn in_memory_conflicts_with_config() {
    let home = TempDir::new().expect("home");
    let file = write_submission(home.path(), "AAABBBCCCDDD");

    dealsync_cmd(home.path())
        .args(["submit", "--in-memory", "--config", "x.yaml"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}
