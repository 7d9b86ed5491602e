//! Cluster lifecycle: Up, Build and Down.
//!
//! Up is split into four steps that must run in order:
//!
//! ```text
//! Empty -> Provisioned -> Inventoried -> Deployed -> EnvironmentReady
//! ```
//!
//! Down moves any state to `Destroyed`. Calling an Up step out of order fails
//! with `InvalidTransition`. A failed step leaves the state where it was; no
//! rollback is attempted.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use ovnci_config::Config;
use ovnci_runner::ProcessRunner;
use ovnci_utils::atomic_write::write_file_atomic;
use ovnci_utils::error::{ClusterError, ConfigError, OvnCiError, Result};
use ovnci_utils::logging::{log_step_complete, log_step_error, log_step_start, step_span};

use crate::artifacts::{ArtifactSource, stage_binaries};
use crate::cloud::{CloudProvider, InstanceSpec};
use crate::environment::TestEnvironment;
use crate::inventory::{self, InventoryBuilder, InventoryLayout};
use crate::kubeconfig;
use crate::node::{Cluster, ClusterRecord, OsFamily};
use crate::provisioner::AnsibleProvisioner;
use crate::remote::{ProbeSettings, RemoteExec};

/// TLS files fetched from the master next to the kubeconfig.
pub const TLS_FILES: [&str; 3] = ["ca.pem", "admin.pem", "admin-key.pem"];

/// Where a cluster is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    Empty,
    Provisioned,
    Inventoried,
    Deployed,
    EnvironmentReady,
    Destroyed,
}

/// Drives one cluster through its lifecycle.
pub struct ClusterLifecycle<C, R, A> {
    config: Config,
    cloud: C,
    runner: R,
    artifacts: A,
    state: LifecycleState,
    cluster: Cluster,
    environment: Option<TestEnvironment>,
}

impl<C, R, A> ClusterLifecycle<C, R, A>
where
    C: CloudProvider,
    R: ProcessRunner,
    A: ArtifactSource,
{
    pub fn new(config: Config, cloud: C, runner: R, artifacts: A) -> Self {
        Self {
            config,
            cloud,
            runner,
            artifacts,
            state: LifecycleState::Empty,
            cluster: Cluster::new(),
            environment: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn environment(&self) -> Option<&TestEnvironment> {
        self.environment.as_ref()
    }

    #[must_use]
    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    /// Fetch and build the workload binaries. Independent of cluster state.
    pub fn build(&mut self) -> Result<()> {
        self.timed("build", |this| {
            this.artifacts.fetch()?;
            this.artifacts.build()
        })
    }

    /// Bring the cluster all the way up and return its test environment.
    pub fn up(&mut self) -> Result<TestEnvironment> {
        self.config.require_for_up()?;
        self.provision()?;
        self.inventory()?;
        self.deploy()?;
        self.prepare_environment()
    }

    /// Delete every configured instance, whatever state the cluster is in.
    pub fn down(&mut self) -> Result<()> {
        self.timed("down", |this| {
            for name in this.config.all_instance_names() {
                info!(instance = %name, "Deleting instance");
                this.cloud.delete_instance(&name)?;
            }
            Ok(())
        })?;
        self.cluster = Cluster::new();
        self.environment = None;
        self.state = LifecycleState::Destroyed;
        Ok(())
    }

    /// `Empty -> Provisioned`: create VMs, attach floating IPs and collect
    /// Windows admin passwords.
    pub fn provision(&mut self) -> Result<()> {
        self.run_step(
            "provision",
            LifecycleState::Empty,
            LifecycleState::Provisioned,
            Self::provision_nodes,
        )
    }

    /// `Provisioned -> Inventoried`: check out the playbook, write the
    /// inventory and stage binaries.
    pub fn inventory(&mut self) -> Result<()> {
        self.run_step(
            "inventory",
            LifecycleState::Provisioned,
            LifecycleState::Inventoried,
            Self::write_inventory,
        )
    }

    /// `Inventoried -> Deployed`: run the playbook.
    pub fn deploy(&mut self) -> Result<()> {
        self.run_step(
            "deploy",
            LifecycleState::Inventoried,
            LifecycleState::Deployed,
            Self::run_playbook,
        )
    }

    /// `Deployed -> EnvironmentReady`: fetch credentials from the master,
    /// reboot Windows nodes and pre-pull images.
    pub fn prepare_environment(&mut self) -> Result<TestEnvironment> {
        self.run_step(
            "prepare_environment",
            LifecycleState::Deployed,
            LifecycleState::EnvironmentReady,
            Self::fetch_environment,
        )
    }

    fn run_step<T>(
        &mut self,
        step: &str,
        from: LifecycleState,
        to: LifecycleState,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.state != from {
            return Err(ClusterError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        let value = self.timed(step, body)?;
        self.state = to;
        Ok(value)
    }

    fn timed<T>(&mut self, step: &str, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let cluster_name = self.config.cluster.name.clone();
        let span = step_span(&cluster_name, step);
        let _enter = span.enter();

        log_step_start(&cluster_name, step);
        let started = Instant::now();
        let result = body(self);
        let elapsed = started.elapsed().as_millis();

        match &result {
            Ok(_) => log_step_complete(&cluster_name, step, elapsed),
            Err(e) => log_step_error(&cluster_name, step, &e.to_string(), elapsed),
        }
        result
    }

    fn provision_nodes(&mut self) -> Result<()> {
        if self.config.linux.vms.is_empty() {
            return Err(ClusterError::MalformedCluster {
                reason: "no Linux VMs configured".to_string(),
            }
            .into());
        }
        let specs = self.instance_specs()?;
        let key_file = self.key_file()?;

        if let Err(err) = self.create_nodes(&specs, &key_file) {
            // Partially created instances are recorded too.
            if let Err(record_err) = self.write_cluster_record() {
                warn!(error = %record_err, "Failed to record partially provisioned cluster");
            }
            return Err(err);
        }

        self.write_cluster_record()
    }

    fn create_nodes(&mut self, specs: &[InstanceSpec], key_file: &Utf8Path) -> Result<()> {
        for spec in specs {
            info!(instance = %spec.name, os = %spec.os, "Creating instance");
            let node = self.cloud.create_instance(spec)?;
            match self.cloud.attach_floating_ip(node.clone()) {
                Ok(node) => {
                    info!(instance = %node.name, floating_ip = ?node.floating_ip, "Floating IP attached");
                    self.cluster.push(node);
                }
                Err(err) => {
                    self.cluster.push(node);
                    return Err(err);
                }
            }
        }

        for node in &mut self.cluster.windows_nodes {
            info!(instance = %node.name, "Waiting for admin password");
            let password = self.cloud.fetch_windows_password(&node.name, key_file)?;
            node.set_admin_password(password);
        }
        Ok(())
    }

    fn run_playbook(&mut self) -> Result<()> {
        let output = self.provisioner()?.deploy()?;
        debug!(output = %output, "Playbook output");

        let path = playbook_log_path(&self.config.cluster.log_path);
        write_file_atomic(&path, &output)
            .map_err(|e| OvnCiError::filesystem(&path, format!("{e:#}")))?;
        info!(path = %path, "Wrote playbook log");
        Ok(())
    }

    fn write_inventory(&mut self) -> Result<()> {
        self.provisioner()?.checkout()?;

        let ansible = &self.config.ansible;
        let builder = InventoryBuilder::new(
            ansible.windows_admin.as_str(),
            ansible.master_alias.as_str(),
            self.config.cluster.log_path.clone(),
        )?;
        let artifact = builder.build(&self.cluster)?;

        let playbook_root = ansible.playbook_root();
        let layout = InventoryLayout::for_playbook_root(&playbook_root, &ansible.hosts_file);
        inventory::write(&artifact, &layout)?;

        let staged = stage_binaries(&self.artifacts, &playbook_root.join("tmp"))?;
        info!(count = staged.len(), "Staged binaries");
        Ok(())
    }

    fn fetch_environment(&mut self) -> Result<TestEnvironment> {
        let master = self.cluster.master()?.clone();
        let remote = self.remote()?;
        let env_config = &self.config.environment;

        info!(master = %master.name, "Fetching kubeconfig from master");
        remote.copy_from(
            &env_config.remote_kubeconfig,
            &env_config.kubeconfig_path,
            &master,
            true,
        )?;
        for file in TLS_FILES {
            let src = format!("{}/{file}", env_config.remote_tls_dir.trim_end_matches('/'));
            remote.copy_from(&src, &env_config.tls_dir.join(file), &master, true)?;
        }

        let env = TestEnvironment::new(
            &self.config.ansible.master_alias,
            &env_config.kubeconfig_path,
            &env_config.tls_dir,
        );
        kubeconfig::rewrite_server(&env_config.kubeconfig_path, &env.master_url)?;

        if env_config.reboot_windows {
            for node in &self.cluster.windows_nodes {
                info!(instance = %node.name, "Rebooting Windows node");
                self.cloud.reboot(&node.name)?;
            }
        }
        self.prepull_images(&remote)?;

        self.environment = Some(env.clone());
        Ok(env)
    }

    fn prepull_images(&self, remote: &RemoteExec<&R>) -> Result<()> {
        let env_config = &self.config.environment;
        let script = &env_config.prepull_script;
        let Some(script_name) = script.file_name() else {
            return Err(ConfigError::InvalidValue {
                key: "environment.prepull_script".to_string(),
                value: script.to_string(),
            }
            .into());
        };
        let remote_script = windows_join(&env_config.prepull_remote_dir, script_name);

        for node in &self.cluster.windows_nodes {
            info!(instance = %node.name, script = %remote_script, "Pre-pulling images");
            remote.copy_to(script, &env_config.prepull_remote_dir, node, false)?;
            remote.run_command(&remote_script, node, false)?;
        }
        Ok(())
    }

    fn write_cluster_record(&self) -> Result<()> {
        let record = ClusterRecord::from_cluster(&self.config.cluster.name, &self.cluster);
        let path = cluster_record_path(&self.config.cluster.log_path);
        let json =
            serde_json::to_string_pretty(&record).map_err(|e| OvnCiError::filesystem(&path, e))?;
        write_file_atomic(&path, &json)
            .map_err(|e| OvnCiError::filesystem(&path, format!("{e:#}")))?;
        info!(path = %path, nodes = record.nodes.len(), "Wrote cluster record");
        Ok(())
    }

    fn instance_specs(&self) -> Result<Vec<InstanceSpec>> {
        let openstack = &self.config.openstack;
        let network = required(openstack.internal_net.as_deref(), "openstack.internal_net")?;
        let key_name = required(openstack.key_name.as_deref(), "openstack.key_name")?;

        let mut specs = Vec::new();
        for (section, group, os) in [
            ("linux", &self.config.linux, OsFamily::Linux),
            ("windows", &self.config.windows, OsFamily::Windows),
        ] {
            if group.vms.is_empty() {
                continue;
            }
            let flavor = required(group.flavor.as_deref(), &format!("{section}.flavor"))?;
            let image_id = required(group.image_id.as_deref(), &format!("{section}.image_id"))?;
            specs.extend(group.vms.iter().map(|vm| InstanceSpec {
                name: self.config.instance_name(vm),
                flavor: flavor.to_string(),
                image_id: image_id.to_string(),
                network: network.to_string(),
                key_name: key_name.to_string(),
                user_data: group.user_data.clone(),
                os,
            }));
        }
        Ok(specs)
    }

    fn key_file(&self) -> Result<Utf8PathBuf> {
        self.config
            .openstack
            .key_file
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired("openstack.key_file".to_string()).into())
    }

    fn provisioner(&self) -> Result<AnsibleProvisioner<&R>> {
        let ansible = &self.config.ansible;
        let timeouts = &self.config.timeouts;
        Ok(AnsibleProvisioner::new(
            &self.runner,
            ansible.repo.as_str(),
            ansible.branch.as_str(),
            ansible.checkout_path.clone(),
            ansible.playbook.as_str(),
            self.key_file()?,
            secs(timeouts.command_secs),
            secs(timeouts.playbook_secs),
        ))
    }

    fn remote(&self) -> Result<RemoteExec<&R>> {
        let timeouts = &self.config.timeouts;
        Ok(RemoteExec::new(
            &self.runner,
            self.config.ansible.playbook_root(),
            self.key_file()?,
            secs(timeouts.command_secs),
        )
        .with_probe(ProbeSettings {
            connect_timeout: secs(timeouts.probe_connect_secs),
            sleep: secs(timeouts.probe_sleep_secs),
            timeout: secs(timeouts.probe_timeout_secs),
        }))
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingRequired(key.to_string()).into())
}

/// Join a Windows directory and a file name.
fn windows_join(dir: &str, file: &str) -> String {
    if dir.ends_with('\\') {
        format!("{dir}{file}")
    } else {
        format!("{dir}\\{file}")
    }
}

/// Path of the cluster record written after provisioning.
#[must_use]
pub fn cluster_record_path(log_path: &Utf8Path) -> Utf8PathBuf {
    log_path.join("cluster.json")
}

/// Captured output of the last successful playbook run.
#[must_use]
pub fn playbook_log_path(log_path: &Utf8Path) -> Utf8PathBuf {
    log_path.join("ansible-playbook.log")
}
