use camino::Utf8Path;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

use ovnci_runner::{CommandSpec, ProcessOutput, ProcessRunner};
use ovnci_utils::error::{ClusterError, Result};

use super::{CloudProvider, InstanceSpec, PollPolicy, poll_password};
use crate::node::Node;

/// Marker the openstack client prints when a server name does not resolve.
const NO_SUCH_SERVER: &str = "No server with a name or ID";

#[derive(Debug, Deserialize)]
struct ServerInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FloatingIpEntry {
    #[serde(rename = "Floating IP Address")]
    address: String,
}

/// [`CloudProvider`] backed by the `openstack` and `nova` command-line clients.
///
/// Credentials come from the usual `OS_*` environment variables, which the
/// clients read themselves.
#[derive(Debug, Clone)]
pub struct OpenStackCli<R> {
    runner: R,
    openstack_bin: String,
    nova_bin: String,
    external_net: Option<String>,
    command_timeout: Duration,
    password_poll: PollPolicy,
}

impl<R: ProcessRunner> OpenStackCli<R> {
    pub fn new(runner: R, command_timeout: Duration, password_poll: PollPolicy) -> Self {
        Self {
            runner,
            openstack_bin: "openstack".to_string(),
            nova_bin: "nova".to_string(),
            external_net: None,
            command_timeout,
            password_poll,
        }
    }

    #[must_use]
    pub fn with_binaries(mut self, openstack: impl Into<String>, nova: impl Into<String>) -> Self {
        self.openstack_bin = openstack.into();
        self.nova_bin = nova.into();
        self
    }

    /// Restrict floating IPs to those of one external network.
    #[must_use]
    pub fn with_external_net(mut self, external_net: Option<String>) -> Self {
        self.external_net = external_net;
        self
    }

    fn openstack(&self) -> CommandSpec {
        CommandSpec::new(&self.openstack_bin)
    }

    /// Run a cloud command, mapping a non-zero exit to `CloudCommandFailed`.
    fn run_checked(&self, operation: &str, cmd: &CommandSpec) -> Result<ProcessOutput> {
        debug!(command = %cmd.display(), "Running cloud command");
        let output = self.runner.run(cmd, self.command_timeout)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ClusterError::CloudCommandFailed {
                operation: operation.to_string(),
                output: output.combined_output(),
            }
            .into())
        }
    }

    fn parse_json<T: serde::de::DeserializeOwned>(operation: &str, output: &ProcessOutput) -> Result<T> {
        serde_json::from_slice(&output.stdout).map_err(|e| {
            ClusterError::CloudCommandFailed {
                operation: operation.to_string(),
                output: format!("unexpected JSON output: {e}"),
            }
            .into()
        })
    }

    fn first_free_floating_ip(&self) -> Result<IpAddr> {
        let cmd = self
            .openstack()
            .args(["floating", "ip", "list", "--status", "DOWN"])
            .args(
                self.external_net
                    .iter()
                    .flat_map(|net| ["--network".to_string(), net.clone()]),
            )
            .args(["-f", "json"]);

        let output = self.run_checked("floating ip list", &cmd)?;
        let entries: Vec<FloatingIpEntry> = Self::parse_json("floating ip list", &output)?;

        let entry = entries.into_iter().next().ok_or_else(|| ClusterError::ResourceExhausted {
            pool: self
                .external_net
                .clone()
                .unwrap_or_else(|| "default".to_string()),
        })?;

        entry.address.parse().map_err(|_| {
            ClusterError::CloudCommandFailed {
                operation: "floating ip list".to_string(),
                output: format!("'{}' is not an IP address", entry.address),
            }
            .into()
        })
    }
}

impl<R: ProcessRunner> CloudProvider for OpenStackCli<R> {
    fn create_instance(&self, spec: &InstanceSpec) -> Result<Node> {
        info!(name = %spec.name, os = %spec.os, flavor = %spec.flavor, "Creating VM");

        let mut cmd = self.openstack().args([
            "server",
            "create",
            "--flavor",
            spec.flavor.as_str(),
            "--image",
            spec.image_id.as_str(),
            "--network",
            spec.network.as_str(),
            "--key-name",
            spec.key_name.as_str(),
        ]);
        if let Some(user_data) = &spec.user_data {
            cmd = cmd.arg("--user-data").arg(user_data.as_str());
        }
        let cmd = cmd.args(["--wait", "-f", "json"]).arg(&spec.name);

        let output = self.run_checked("server create", &cmd)?;
        let server: ServerInfo = Self::parse_json("server create", &output)?;

        Ok(Node::new(server.name, spec.os))
    }

    fn attach_floating_ip(&self, node: Node) -> Result<Node> {
        let ip = self.first_free_floating_ip()?;
        let cmd = self
            .openstack()
            .args(["server", "add", "floating", "ip"])
            .arg(&node.name)
            .arg(ip.to_string());

        self.run_checked("server add floating ip", &cmd)?;
        info!(name = %node.name, floating_ip = %ip, "Attached floating IP");

        Ok(node.with_floating_ip(ip))
    }

    fn fetch_windows_password(&self, name: &str, private_key: &Utf8Path) -> Result<String> {
        let cmd = CommandSpec::new(&self.nova_bin)
            .arg("get-password")
            .arg(name)
            .arg(private_key.as_str());

        poll_password(name, self.password_poll, || {
            let output = self.run_checked("get-password", &cmd)?;
            Ok(Some(output.stdout_string().trim().to_string()))
        })
    }

    fn delete_instance(&self, name: &str) -> Result<()> {
        let cmd = self.openstack().args(["server", "delete", "--wait"]).arg(name);
        debug!(command = %cmd.display(), "Running cloud command");

        let output = self.runner.run(&cmd, self.command_timeout)?;
        if output.success() {
            info!(name = %name, "Deleted VM");
            return Ok(());
        }

        let combined = output.combined_output();
        if combined.contains(NO_SUCH_SERVER) {
            debug!(name = %name, "VM already absent");
            return Ok(());
        }

        Err(ClusterError::CloudCommandFailed {
            operation: "server delete".to_string(),
            output: combined,
        }
        .into())
    }

    fn reboot(&self, name: &str) -> Result<()> {
        let cmd = self.openstack().args(["server", "reboot", "--wait"]).arg(name);
        self.run_checked("server reboot", &cmd)?;
        info!(name = %name, "Rebooted VM");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::OsFamily;
    use crate::test_support::ScriptedRunner;
    use ovnci_utils::error::OvnCiError;

    fn cli(runner: &ScriptedRunner) -> OpenStackCli<&ScriptedRunner> {
        OpenStackCli::new(
            runner,
            Duration::from_secs(30),
            PollPolicy::new(Duration::ZERO, Duration::from_millis(50)),
        )
    }

    fn spec() -> InstanceSpec {
        InstanceSpec {
            name: "ci-master".to_string(),
            flavor: "m1.large".to_string(),
            image_id: "ubuntu".to_string(),
            network: "private".to_string(),
            key_name: "ci".to_string(),
            user_data: Some("/etc/ovnci/linux.yaml".into()),
            os: OsFamily::Linux,
        }
    }

    #[test]
    fn test_create_instance_argv_and_name() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::ok(r#"{"name": "ci-master", "id": "abc"}"#)));
        let node = cli(&runner).create_instance(&spec()).unwrap();

        assert_eq!(node.name, "ci-master");
        assert_eq!(node.os(), OsFamily::Linux);
        assert_eq!(
            runner.calls()[0].display(),
            "openstack server create --flavor m1.large --image ubuntu --network private \
             --key-name ci --user-data /etc/ovnci/linux.yaml --wait -f json ci-master"
        );
    }

    #[test]
    fn test_attach_takes_first_free_ip() {
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.display().contains("floating ip list") {
                Ok(ProcessOutput::ok(
                    r#"[{"ID": "1", "Floating IP Address": "172.24.4.10"},
                        {"ID": "2", "Floating IP Address": "172.24.4.11"}]"#,
                ))
            } else {
                Ok(ProcessOutput::ok(""))
            }
        });
        let cloud = cli(&runner).with_external_net(Some("public".to_string()));

        let node = cloud
            .attach_floating_ip(Node::new("ci-master", OsFamily::Linux))
            .unwrap();

        assert_eq!(node.floating_ip, Some("172.24.4.10".parse().unwrap()));
        let calls = runner.calls();
        assert_eq!(
            calls[0].display(),
            "openstack floating ip list --status DOWN --network public -f json"
        );
        assert_eq!(
            calls[1].display(),
            "openstack server add floating ip ci-master 172.24.4.10"
        );
    }

    #[test]
    fn test_empty_pool_is_resource_exhausted() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::ok("[]")));
        let result = cli(&runner).attach_floating_ip(Node::new("n", OsFamily::Linux));

        assert!(matches!(
            result,
            Err(OvnCiError::Cluster(ClusterError::ResourceExhausted { ref pool })) if pool == "default"
        ));
        // Nothing was bound
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_password_polled_until_present() {
        let runner = ScriptedRunner::sequence(vec![
            Ok(ProcessOutput::ok("")),
            Ok(ProcessOutput::ok("\n")),
            Ok(ProcessOutput::ok("P@ssw0rd\n")),
        ]);
        let password = cli(&runner)
            .fetch_windows_password("win", Utf8Path::new("/root/id_rsa"))
            .unwrap();

        assert_eq!(password, "P@ssw0rd");
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(runner.calls()[0].display(), "nova get-password win /root/id_rsa");
    }

    #[test]
    fn test_password_never_available() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::ok("")));
        let result = cli(&runner).fetch_windows_password("win", Utf8Path::new("/k"));

        assert!(matches!(
            result,
            Err(OvnCiError::Cluster(ClusterError::PasswordUnavailable { .. }))
        ));
    }

    #[test]
    fn test_delete_missing_server_is_ok() {
        let runner = ScriptedRunner::new(|_| {
            Ok(ProcessOutput::failed(
                1,
                "No server with a name or ID of 'ci-master' exists.",
            ))
        });
        assert!(cli(&runner).delete_instance("ci-master").is_ok());
    }

    #[test]
    fn test_delete_other_failure_is_cloud_error() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::failed(1, "Unauthorized (HTTP 401)")));
        let result = cli(&runner).delete_instance("ci-master");

        match result {
            Err(OvnCiError::Cluster(ClusterError::CloudCommandFailed { operation, output })) => {
                assert_eq!(operation, "server delete");
                assert!(output.contains("401"));
            }
            other => panic!("Expected CloudCommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_reboot_argv() {
        let runner = ScriptedRunner::new(|_| Ok(ProcessOutput::ok("")));
        cli(&runner).with_binaries("os", "nv").reboot("win").unwrap();
        assert_eq!(runner.calls()[0].display(), "os server reboot --wait win");
    }
}
