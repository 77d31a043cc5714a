//! Integration tests for the `netpol-synth` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn netpol_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_netpol-synth"));
    cmd.env("RUST_LOG", "error");
    cmd
}

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/wordpress");

#[test]
fn test_policies_yaml() {
    netpol_cmd()
        .args(["policies", FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: wordpress-netpol"))
        .stdout(predicate::str::contains("name: wordpress-mysql-netpol"))
        .stdout(predicate::str::contains("name: default-deny-in-namespace"))
        .stdout(predicate::str::contains("---"));
}

#[test]
fn test_policies_json_to_file() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("policies.json");

    netpol_cmd()
        .args(["policies", FIXTURE, "--format", "json", "--dns-port", "5353", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["kind"], "NetworkPolicyList");
    assert_eq!(value["items"].as_array().unwrap().len(), 3);
    let egress = &value["items"][0]["spec"]["egress"];
    assert_eq!(egress[1]["ports"][0]["port"], 5353);
}

#[test]
fn test_connections_text() {
    netpol_cmd()
        .args(["connections", FIXTURE, "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wordpress => wordpress-mysql [wordpress-mysql] 3306/TCP"))
        .stdout(predicate::str::contains("<any> => wordpress [wordpress] 80/TCP"));
}

#[test]
fn test_no_relevant_resources_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("role.yaml"),
        "apiVersion: rbac.authorization.k8s.io/v1\nkind: Role\nmetadata:\n  name: reader\n",
    )
    .unwrap();

    netpol_cmd()
        .arg("policies")
        .arg(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no relevant Kubernetes resources found"));
}

#[test]
fn test_config_file_sets_format() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("netpol.toml");
    fs::write(&config, "[output]\nformat = \"json\"\n").unwrap();

    netpol_cmd()
        .args(["connections", FIXTURE, "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_missing_path_argument() {
    netpol_cmd()
        .arg("policies")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PATH"));
}
