//! Ad-hoc remote execution through `ansible`.
//!
//! Every action first probes the host with `wait_for_connection`; the
//! transport command is only spawned once the probe succeeds.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use ovnci_runner::{CommandSpec, ProcessRunner, RunnerError};
use ovnci_utils::error::{ClusterError, Result};

use crate::node::Node;

/// Slack added on top of the probe's own timeout for the runner deadline.
const PROBE_SLACK: Duration = Duration::from_secs(30);

/// Connectivity probe parameters, passed to `wait_for_connection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub connect_timeout: Duration,
    pub sleep: Duration,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            sleep: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

impl ProbeSettings {
    fn module_args(&self) -> String {
        format!(
            "connect_timeout={} sleep={} timeout={}",
            self.connect_timeout.as_secs(),
            self.sleep.as_secs(),
            self.timeout.as_secs()
        )
    }
}

/// Runs copy/fetch/shell modules against single hosts.
#[derive(Debug, Clone)]
pub struct RemoteExec<R> {
    runner: R,
    playbook_root: Utf8PathBuf,
    key_file: Utf8PathBuf,
    probe: ProbeSettings,
    command_timeout: Duration,
}

impl<R: ProcessRunner> RemoteExec<R> {
    /// Commands run from `playbook_root` so ansible picks up its inventory
    /// and `ansible.cfg`.
    pub fn new(
        runner: R,
        playbook_root: impl Into<Utf8PathBuf>,
        key_file: impl Into<Utf8PathBuf>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            playbook_root: playbook_root.into(),
            key_file: key_file.into(),
            probe: ProbeSettings::default(),
            command_timeout,
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: ProbeSettings) -> Self {
        self.probe = probe;
        self
    }

    fn key_file_arg(&self, node: &Node) -> Option<String> {
        (!node.is_windows()).then(|| format!("--key-file={}", self.key_file))
    }

    /// Wait for `node` to accept connections.
    ///
    /// A non-zero exit or a runner timeout fails with `Unreachable`.
    pub fn probe(&self, node: &Node) -> Result<()> {
        let mut cmd = CommandSpec::new("ansible").arg(&node.name);
        if let Some(key) = self.key_file_arg(node) {
            cmd = cmd.arg(key);
        }
        let cmd = cmd
            .args(["-m", "wait_for_connection", "-a"])
            .arg(self.probe.module_args())
            .cwd(self.playbook_root.as_std_path());

        debug!(host = %node.name, "Probing connectivity");
        let unreachable = || ClusterError::Unreachable {
            host: node.name.clone(),
        };
        match self.runner.run(&cmd, self.probe.timeout + PROBE_SLACK) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => {
                warn!(host = %node.name, output = %output.combined_output(), "Connectivity probe failed");
                Err(unreachable().into())
            }
            Err(RunnerError::Timeout { .. }) => Err(unreachable().into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Probe, then run one ansible module against `node`.
    fn run_module(&self, node: &Node, module: &str, module_args: String, elevate: bool) -> Result<String> {
        self.probe(node)?;

        let mut cmd = CommandSpec::new("ansible").arg_if(elevate, "--become");
        if let Some(key) = self.key_file_arg(node) {
            cmd = cmd.arg(key);
        }
        let cmd = cmd
            .arg(&node.name)
            .args(["-m", module, "-a"])
            .arg(module_args)
            .cwd(self.playbook_root.as_std_path());

        info!(host = %node.name, module = %module, elevate, "Running remote action");
        let output = self.runner.run(&cmd, self.command_timeout)?;
        if !output.success() {
            return Err(ClusterError::RemoteCommandFailed {
                host: node.name.clone(),
                action: module.to_string(),
                output: output.combined_output(),
            }
            .into());
        }
        Ok(output.stdout_string())
    }

    /// Copy a local file onto `node`.
    pub fn copy_to(&self, local: &Utf8Path, remote: &str, node: &Node, elevate: bool) -> Result<()> {
        let module = if node.is_windows() { "win_copy" } else { "copy" };
        let args = serde_json::json!({ "src": local.as_str(), "dest": remote });
        self.run_module(node, module, args.to_string(), elevate)
            .map(drop)
    }

    /// Fetch a file from `node` to an exact local path.
    pub fn copy_from(&self, remote: &str, local: &Utf8Path, node: &Node, elevate: bool) -> Result<()> {
        let args = serde_json::json!({ "src": remote, "dest": local.as_str(), "flat": true });
        self.run_module(node, "fetch", args.to_string(), elevate)
            .map(drop)
    }

    /// Run a shell command on `node`, returning the captured stdout.
    pub fn run_command(&self, command: &str, node: &Node, elevate: bool) -> Result<String> {
        let module = if node.is_windows() { "win_shell" } else { "shell" };
        self.run_module(node, module, command.to_string(), elevate)
    }
}
