//! Command implementations
//!
//! Each command builds the production collaborators (`NativeRunner`,
//! `OpenStackCli`, `KubernetesSource`) from the effective configuration and
//! hands them to a [`ClusterLifecycle`].

use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::info;

use ovnci_config::Config;
use ovnci_engine::{ClusterLifecycle, KubernetesSource, OpenStackCli, PollPolicy, TestEnvironment};
use ovnci_runner::NativeRunner;
use ovnci_utils::error::{OvnCiError, Result};

use crate::doctor;

type NativeLifecycle =
    ClusterLifecycle<OpenStackCli<NativeRunner>, NativeRunner, KubernetesSource<NativeRunner>>;

/// Build a lifecycle wired to the real cloud, ansible and git.
pub fn native_lifecycle(config: &Config) -> NativeLifecycle {
    let runner = NativeRunner::new();
    let timeouts = &config.timeouts;

    let cloud = OpenStackCli::new(
        runner,
        Duration::from_secs(timeouts.command_secs),
        PollPolicy::new(
            Duration::from_secs(timeouts.password_poll_interval_secs),
            Duration::from_secs(timeouts.password_timeout_secs),
        ),
    )
    .with_binaries(
        config.openstack.openstack_bin.as_str(),
        config.openstack.nova_bin.as_str(),
    )
    .with_external_net(config.openstack.external_net.clone());

    let k8s = &config.kubernetes;
    let artifacts = KubernetesSource::new(
        runner,
        k8s.repo.as_str(),
        k8s.branch.as_str(),
        k8s.checkout_path.clone(),
        &k8s.linux_bin_dir,
        &k8s.windows_bin_dir,
        Duration::from_secs(timeouts.build_secs),
    );

    ClusterLifecycle::new(config.clone(), cloud, runner, artifacts)
}

/// Location of the export script written after a successful `up`.
#[must_use]
pub fn test_env_script_path(config: &Config) -> Utf8PathBuf {
    config.cluster.log_path.join("test-env.sh")
}

/// Write the export script and print its lines on stdout.
pub fn publish_environment(config: &Config, env: &TestEnvironment) -> Result<Utf8PathBuf> {
    let path = test_env_script_path(config);
    env.write_export_script(&path)?;
    print!("{}", env.export_script());
    Ok(path)
}

pub fn execute_up_command(config: &Config) -> Result<()> {
    let mut lifecycle = native_lifecycle(config);
    let env = lifecycle.up()?;
    let path = publish_environment(config, &env)?;
    info!(path = %path, master_url = %env.master_url, "Cluster ready");
    Ok(())
}

pub fn execute_build_command(config: &Config) -> Result<()> {
    native_lifecycle(config).build()
}

pub fn execute_down_command(config: &Config) -> Result<()> {
    native_lifecycle(config).down()?;
    info!(
        instances = config.all_instance_names().len(),
        "Cluster instances deleted"
    );
    Ok(())
}

/// Returns whether every check passed.
pub fn execute_doctor_command(config: &Config, json: bool) -> Result<bool> {
    let output = doctor::run_checks(config);

    if json {
        let rendered = serde_json::to_string_pretty(&output)
            .map_err(|e| OvnCiError::filesystem("<stdout>", e))?;
        println!("{rendered}");
    } else {
        print!("{}", doctor::render_report(&output));
        if !output.ok {
            println!("\nSome checks failed. Please address the issues above before running ovnci up.");
        }
    }

    Ok(output.ok)
}
