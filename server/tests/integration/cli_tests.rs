//! End-to-end checks of the `mchost` binary.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn mchost(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mchost"));
    cmd.env("NO_COLOR", "1")
        .env("MCHOST_YES", "1")
        .env("MCHOST_DATA_DIR", data_dir)
        .env("MCHOST_FIREWALL", "disabled")
        .env("MCHOST_UPNP_ENABLED", "false")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn no_args_shows_help() {
    let dir = tempfile::tempdir().expect("tempdir");
    mchost(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Provision and run per-tenant game servers"));
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().expect("tempdir");
    mchost(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("upload-world"));
}

#[test]
fn create_then_list_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    mchost(dir.path())
        .args(["create", "--owner", "3", "--plan", "java", "--ram", "4 GB"])
        .assert()
        .success();

    let output = mchost(dir.path())
        .args(["list", "--json"])
        .output()
        .expect("run list");
    assert!(output.status.success());
    let servers: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(servers.as_array().map(Vec::len), Some(1));
    assert_eq!(servers[0]["owner"], 3);
    assert_eq!(servers[0]["mem_limit"], "4g");
    assert!(dir.path().join("servers.json").is_file());
}

#[test]
fn unknown_firewall_fails_with_json_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    mchost(dir.path())
        .env("MCHOST_FIREWALL", "iptables")
        .args(["list", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"error\""));
}
