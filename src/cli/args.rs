//! CLI argument definitions and parsing structures

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ovnci_config::CliArgs;

/// ovnci - mixed Linux/Windows Kubernetes clusters on OpenStack for CI
#[derive(Parser, Debug)]
#[command(name = "ovnci")]
#[command(about = "Provision OVN/OVS Kubernetes test clusters on OpenStack and bootstrap them with Ansible")]
#[command(long_about = r#"
ovnci creates Linux and Windows VMs on OpenStack, writes an Ansible inventory
for the ovn-kubernetes playbook, deploys the cluster and exports the
environment the Kubernetes e2e suites expect.

EXAMPLES:
  # Build kubelet, kubectl and friends for both platforms
  ovnci build --k8s-branch release-1.12

  # Bring a cluster up and source its environment
  ovnci --cluster-name ci42 --linux-vm master --linux-vm node1 \
        --windows-vm winnode1 --key-file ~/.ssh/ci up
  . /tmp/ovnci/test-env.sh

  # Tear it down again (safe to repeat)
  ovnci --cluster-name ci42 --linux-vm master --linux-vm node1 \
        --windows-vm winnode1 down

  # Check tools on PATH and show the effective configuration
  ovnci doctor

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .ovnci/config.toml
  Use --config to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cluster name, used as VM name prefix
    #[arg(long, global = true)]
    pub cluster_name: Option<String>,

    /// Directory for logs, cluster.json and test-env.sh
    #[arg(long, global = true)]
    pub log_path: Option<Utf8PathBuf>,

    /// Linux VM name (repeatable; the first one is the master)
    #[arg(long = "linux-vm", global = true)]
    pub linux_vms: Vec<String>,

    #[arg(long, global = true)]
    pub linux_flavor: Option<String>,

    #[arg(long, global = true)]
    pub linux_image_id: Option<String>,

    /// Cloud-init user data for Linux VMs
    #[arg(long, global = true)]
    pub linux_user_data: Option<Utf8PathBuf>,

    /// Windows VM name (repeatable)
    #[arg(long = "windows-vm", global = true)]
    pub windows_vms: Vec<String>,

    #[arg(long, global = true)]
    pub windows_flavor: Option<String>,

    #[arg(long, global = true)]
    pub windows_image_id: Option<String>,

    /// Cloudbase-init user data for Windows VMs
    #[arg(long, global = true)]
    pub windows_user_data: Option<Utf8PathBuf>,

    /// Nova keypair name
    #[arg(long, global = true)]
    pub key_name: Option<String>,

    /// Private key matching --key-name, used for SSH and password decryption
    #[arg(long, global = true)]
    pub key_file: Option<Utf8PathBuf>,

    /// Network the VMs are attached to
    #[arg(long, global = true)]
    pub internal_net: Option<String>,

    /// Network floating IPs are taken from
    #[arg(long, global = true)]
    pub external_net: Option<String>,

    /// ovn-kubernetes repository holding the playbook
    #[arg(long, global = true)]
    pub ansible_repo: Option<String>,

    #[arg(long, global = true)]
    pub ansible_branch: Option<String>,

    /// Kubernetes repository to build from
    #[arg(long, global = true)]
    pub k8s_repo: Option<String>,

    #[arg(long, global = true)]
    pub k8s_branch: Option<String>,

    /// Skip the Windows reboot after deployment
    #[arg(long, global = true)]
    pub no_reboot: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Commands {
    /// Create VMs, deploy Kubernetes and export the test environment
    Up,

    /// Clone and build the Kubernetes binaries
    Build,

    /// Delete every configured VM
    Down,

    /// Check required tools and print the effective configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Overrides for the configuration system.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            cluster_name: self.cluster_name.clone(),
            log_path: self.log_path.clone(),
            linux_vms: self.linux_vms.clone(),
            linux_flavor: self.linux_flavor.clone(),
            linux_image_id: self.linux_image_id.clone(),
            linux_user_data: self.linux_user_data.clone(),
            windows_vms: self.windows_vms.clone(),
            windows_flavor: self.windows_flavor.clone(),
            windows_image_id: self.windows_image_id.clone(),
            windows_user_data: self.windows_user_data.clone(),
            key_name: self.key_name.clone(),
            key_file: self.key_file.clone(),
            internal_net: self.internal_net.clone(),
            external_net: self.external_net.clone(),
            ansible_repo: self.ansible_repo.clone(),
            ansible_branch: self.ansible_branch.clone(),
            k8s_repo: self.k8s_repo.clone(),
            k8s_branch: self.k8s_branch.clone(),
            no_reboot: self.no_reboot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeatable_vm_flags() {
        let cli = Cli::try_parse_from([
            "ovnci",
            "--linux-vm",
            "master",
            "--linux-vm",
            "node1",
            "--windows-vm",
            "winnode1",
            "--key-file",
            "/home/ci/.ssh/id_rsa",
            "up",
        ])
        .unwrap();

        assert_eq!(cli.command, Commands::Up);
        let args = cli.to_cli_args();
        assert_eq!(args.linux_vms, vec!["master", "node1"]);
        assert_eq!(args.windows_vms, vec!["winnode1"]);
        assert_eq!(args.key_file.as_deref().map(|p| p.as_str()), Some("/home/ci/.ssh/id_rsa"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ovnci", "down", "--cluster-name", "ci42", "--no-reboot"])
            .unwrap();
        assert_eq!(cli.command, Commands::Down);
        assert_eq!(cli.cluster_name.as_deref(), Some("ci42"));
        assert!(cli.no_reboot);
    }

    #[test]
    fn test_doctor_json_flag() {
        let cli = Cli::try_parse_from(["ovnci", "doctor", "--json"]).unwrap();
        assert_eq!(cli.command, Commands::Doctor { json: true });
        assert_eq!(cli.command.to_string(), "doctor");
    }

    #[test]
    fn test_down_example_names_the_vms() {
        let help = Cli::command().render_long_help().to_string();
        let example: Vec<&str> = help
            .lines()
            .skip_while(|line| !line.contains("Tear it down"))
            .skip(1)
            .take(2)
            .collect();
        let example = example.join(" ");

        assert!(example.contains("--linux-vm master"));
        assert!(example.contains("--windows-vm winnode1"));
        assert!(example.trim_end().ends_with("down"));
    }
}
