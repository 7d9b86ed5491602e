use camino::Utf8PathBuf;
use std::time::Duration;
use tracing::info;

use ovnci_runner::{CommandSpec, ProcessRunner};
use ovnci_utils::error::{ClusterError, Result};

use crate::git::clone_repo;

/// The ovn-kubernetes playbook, applied with `ansible-playbook`.
#[derive(Debug, Clone)]
pub struct AnsibleProvisioner<R> {
    runner: R,
    repo: String,
    branch: String,
    checkout: Utf8PathBuf,
    playbook: String,
    key_file: Utf8PathBuf,
    checkout_timeout: Duration,
    playbook_timeout: Duration,
}

impl<R: ProcessRunner> AnsibleProvisioner<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runner: R,
        repo: impl Into<String>,
        branch: impl Into<String>,
        checkout: impl Into<Utf8PathBuf>,
        playbook: impl Into<String>,
        key_file: impl Into<Utf8PathBuf>,
        checkout_timeout: Duration,
        playbook_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            repo: repo.into(),
            branch: branch.into(),
            checkout: checkout.into(),
            playbook: playbook.into(),
            key_file: key_file.into(),
            checkout_timeout,
            playbook_timeout,
        }
    }

    /// `<checkout>/contrib`, where the playbook, inventory and ansible.cfg live.
    #[must_use]
    pub fn playbook_root(&self) -> Utf8PathBuf {
        self.checkout.join("contrib")
    }

    /// Fresh clone of the playbook repository.
    pub fn checkout(&self) -> Result<()> {
        clone_repo(
            &self.runner,
            &self.repo,
            &self.branch,
            &self.checkout,
            self.checkout_timeout,
        )
    }

    /// Run the playbook against the written inventory.
    ///
    /// Returns the captured playbook output on success.
    pub fn deploy(&self) -> Result<String> {
        let cmd = CommandSpec::new("ansible-playbook")
            .arg(&self.playbook)
            .arg("-v")
            .arg(format!("--key-file={}", self.key_file))
            .cwd(self.playbook_root().as_std_path());

        info!(playbook = %self.playbook, cwd = %self.playbook_root(), "Running playbook");
        let output = self.runner.run(&cmd, self.playbook_timeout)?;
        if !output.success() {
            return Err(ClusterError::ProvisionerFailed {
                playbook: self.playbook.clone(),
                output: output.combined_output(),
            }
            .into());
        }
        Ok(output.stdout_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;
    use ovnci_runner::ProcessOutput;
    use ovnci_utils::error::OvnCiError;

    fn provisioner(runner: &ScriptedRunner) -> AnsibleProvisioner<&ScriptedRunner> {
        AnsibleProvisioner::new(
            runner,
            "http://github.com/openvswitch/ovn-kubernetes",
            "master",
            "/tmp/ovn-kubernetes",
            "ovn-kubernetes-cluster.yml",
            "/home/ci/.ssh/id_rsa",
            Duration::from_secs(60),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn test_deploy_command_and_cwd() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::ok("PLAY RECAP\nmaster : ok=12")));
        let out = provisioner(&runner).deploy().unwrap();

        assert!(out.contains("PLAY RECAP"));
        let calls = runner.calls();
        assert_eq!(
            calls[0].display(),
            "ansible-playbook ovn-kubernetes-cluster.yml -v --key-file=/home/ci/.ssh/id_rsa"
        );
        assert_eq!(
            calls[0].cwd.as_deref(),
            Some(std::path::Path::new("/tmp/ovn-kubernetes/contrib"))
        );
    }

    #[test]
    fn test_deploy_failure_is_provisioner_failed() {
        let runner = ScriptedRunner::new(|_| {
            Ok(ProcessOutput::new(
                b"TASK [kube-master]\nfatal: [master]: FAILED!".to_vec(),
                Vec::new(),
                Some(2),
            ))
        });

        match provisioner(&runner).deploy().unwrap_err() {
            OvnCiError::Cluster(ClusterError::ProvisionerFailed { playbook, output }) => {
                assert_eq!(playbook, "ovn-kubernetes-cluster.yml");
                assert!(output.contains("FAILED!"));
            }
            other => panic!("Expected ProvisionerFailed, got {other:?}"),
        }
    }
}
