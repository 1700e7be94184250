//! CLI argument handling smoke tests. Nothing here touches the network:
//! every case fails before the first request.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("azure-usage").unwrap();
    cmd.env_remove("AZURE_ACCESS_TOKEN");
    cmd
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instances"))
        .stdout(predicate::str::contains("daily"))
        .stdout(predicate::str::contains("monthly"));
}

#[test]
fn invalid_date_is_rejected() {
    cmd()
        .args([
            "total",
            "sub-1",
            "--since",
            "03/01/2025",
            "--until",
            "2025-03-31",
            "--token",
            "t",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn missing_credential_is_reported() {
    cmd()
        .args([
            "total",
            "sub-1",
            "--since",
            "2025-03-01",
            "--until",
            "2025-03-31",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("AZURE_ACCESS_TOKEN"));
}

#[test]
fn invalid_regex_is_rejected() {
    cmd()
        .args([
            "instances",
            "sub-1",
            "--since",
            "2025-03-01",
            "--until",
            "2025-03-31",
            "--token",
            "t",
            "--regex",
            "(",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid filter pattern"));
}
