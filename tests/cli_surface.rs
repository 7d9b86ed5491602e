//! CLI surface: argument handling, exit codes and config discovery.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

use ovnci::{CliArgs, Config};

/// A scratch working directory that stops config discovery at its `.git`.
fn workdir() -> Result<TempDir> {
    let dir = TempDir::new()?;
    fs::create_dir(dir.path().join(".git"))?;
    Ok(dir)
}

fn ovnci(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ovnci"));
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() -> Result<()> {
    let dir = workdir()?;
    ovnci(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("doctor"));
    Ok(())
}

#[test]
fn test_unknown_subcommand_is_usage_error() -> Result<()> {
    let dir = workdir()?;
    ovnci(&dir).arg("launch").assert().code(2);
    Ok(())
}

#[test]
fn test_up_without_key_file_exits_with_config_error() -> Result<()> {
    let dir = workdir()?;
    ovnci(&dir)
        .args(["--linux-vm", "master", "up"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("openstack.key_file"));
    Ok(())
}

#[test]
fn test_missing_explicit_config_exits_with_config_error() -> Result<()> {
    let dir = workdir()?;
    ovnci(&dir)
        .args(["--config", "does-not-exist.toml", "down"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does-not-exist.toml"));
    Ok(())
}

#[test]
fn test_invalid_config_file_is_rejected() -> Result<()> {
    let dir = workdir()?;
    fs::create_dir(dir.path().join(".ovnci"))?;
    fs::write(
        dir.path().join(".ovnci/config.toml"),
        "[cluster]\nname = \"ci\"\nflavour = \"typo\"\n",
    )?;

    ovnci(&dir).arg("down").assert().code(2);
    Ok(())
}

#[test]
fn test_doctor_json_reports_missing_tools() -> Result<()> {
    let dir = workdir()?;
    let output = ovnci(&dir)
        .args(["doctor", "--json"])
        .env("PATH", dir.path())
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(report["ok"], serde_json::Value::Bool(false));
    let checks = report["checks"].as_array().cloned().unwrap_or_default();
    let openstack = checks
        .iter()
        .find(|c| c["name"] == "openstack")
        .cloned()
        .unwrap_or_default();
    assert_eq!(openstack["status"], "fail");
    assert_eq!(report["config"]["ansible.branch"][1], "default");
    Ok(())
}

#[test]
fn test_doctor_shows_cli_overrides() -> Result<()> {
    let dir = workdir()?;
    ovnci(&dir)
        .args(["--ansible-branch", "dev", "doctor"])
        .env("PATH", dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ansible.branch = dev (cli)"));
    Ok(())
}

#[test]
#[serial]
fn test_discover_reads_config_from_current_directory() -> Result<()> {
    let dir = workdir()?;
    let nested = dir.path().join("jobs/nightly");
    fs::create_dir_all(&nested)?;
    fs::create_dir(dir.path().join(".ovnci"))?;
    fs::write(
        dir.path().join(".ovnci/config.toml"),
        "[cluster]\nname = \"nightly\"\n\n[linux]\nvms = [\"master\", \"node1\"]\n",
    )?;

    let previous = std::env::current_dir()?;
    std::env::set_current_dir(&nested)?;
    let discovered = Config::discover(&CliArgs::default());
    std::env::set_current_dir(previous)?;

    let config = discovered?;
    assert_eq!(config.cluster.name, "nightly");
    assert_eq!(
        config.all_instance_names(),
        vec!["nightly-master", "nightly-node1"]
    );
    Ok(())
}
