use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default timeout for ad-hoc remote and cloud commands in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Default timeout for the cluster playbook run in seconds
pub const DEFAULT_PLAYBOOK_TIMEOUT_SECS: u64 = 7200;

/// Default timeout for each workload build step in seconds
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 7200;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Defaults => write!(f, "default"),
        }
    }
}

/// Effective configuration after applying CLI > file > defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub linux: NodeGroupConfig,
    pub windows: NodeGroupConfig,
    pub openstack: OpenStackConfig,
    pub ansible: AnsibleConfig,
    pub kubernetes: KubernetesConfig,
    pub environment: EnvironmentConfig,
    pub timeouts: TimeoutsConfig,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            linux: NodeGroupConfig::default(),
            windows: NodeGroupConfig::default(),
            openstack: OpenStackConfig::default(),
            ansible: AnsibleConfig::default(),
            kubernetes: KubernetesConfig::default(),
            environment: EnvironmentConfig::default(),
            timeouts: TimeoutsConfig::default(),
            source_attribution: HashMap::new(),
        }
    }
}

/// `[cluster]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Prefix for VM names; empty means VM names are used as given.
    pub name: String,
    /// Directory receiving ansible-deploy.log, cluster.json and test-env.sh
    pub log_path: Utf8PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            log_path: Utf8PathBuf::from("/tmp/ovnci"),
        }
    }
}

/// `[linux]` and `[windows]` sections
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeGroupConfig {
    pub vms: Vec<String>,
    pub flavor: Option<String>,
    pub image_id: Option<String>,
    pub user_data: Option<Utf8PathBuf>,
}

/// `[openstack]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenStackConfig {
    pub key_name: Option<String>,
    pub key_file: Option<Utf8PathBuf>,
    pub internal_net: Option<String>,
    pub external_net: Option<String>,
    pub openstack_bin: String,
    pub nova_bin: String,
}

impl Default for OpenStackConfig {
    fn default() -> Self {
        Self {
            key_name: None,
            key_file: None,
            internal_net: None,
            external_net: None,
            openstack_bin: "openstack".to_string(),
            nova_bin: "nova".to_string(),
        }
    }
}

/// `[ansible]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnsibleConfig {
    pub repo: String,
    pub branch: String,
    /// Local checkout of the playbook repository
    pub checkout_path: Utf8PathBuf,
    pub playbook: String,
    pub windows_admin: String,
    /// Extra hosts-file token for the master node
    pub master_alias: String,
    pub hosts_file: Utf8PathBuf,
}

impl Default for AnsibleConfig {
    fn default() -> Self {
        Self {
            repo: "http://github.com/openvswitch/ovn-kubernetes".to_string(),
            branch: "master".to_string(),
            checkout_path: Utf8PathBuf::from("/tmp/ovn-kubernetes"),
            playbook: "ovn-kubernetes-cluster.yml".to_string(),
            windows_admin: "Admin".to_string(),
            master_alias: "kubernetes".to_string(),
            hosts_file: Utf8PathBuf::from("/etc/hosts"),
        }
    }
}

impl AnsibleConfig {
    /// Directory the playbook and ad-hoc commands run from.
    #[must_use]
    pub fn playbook_root(&self) -> Utf8PathBuf {
        self.checkout_path.join("contrib")
    }
}

/// `[kubernetes]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubernetesConfig {
    pub repo: String,
    pub branch: String,
    pub checkout_path: Utf8PathBuf,
    /// Linux build output, relative to the checkout
    pub linux_bin_dir: Utf8PathBuf,
    /// Windows build output, relative to the checkout
    pub windows_bin_dir: Utf8PathBuf,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            repo: "https://github.com/kubernetes/kubernetes".to_string(),
            branch: "master".to_string(),
            checkout_path: Utf8PathBuf::from("/tmp/kubernetes"),
            linux_bin_dir: Utf8PathBuf::from("_output/local/bin/linux/amd64"),
            windows_bin_dir: Utf8PathBuf::from("_output/local/bin/windows/amd64"),
        }
    }
}

/// `[environment]` section: test environment handed to downstream suites
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub kubeconfig_path: Utf8PathBuf,
    /// Local directory receiving ca.pem, admin.pem and admin-key.pem
    pub tls_dir: Utf8PathBuf,
    pub remote_kubeconfig: String,
    pub remote_tls_dir: String,
    pub reboot_windows: bool,
    pub prepull_script: Utf8PathBuf,
    pub prepull_remote_dir: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            kubeconfig_path: Utf8PathBuf::from("/tmp/kubeconfig"),
            tls_dir: Utf8PathBuf::from("/etc/kubernetes/tls"),
            remote_kubeconfig: "/root/.kube/config".to_string(),
            remote_tls_dir: "/etc/kubernetes/tls".to_string(),
            reboot_windows: true,
            prepull_script: Utf8PathBuf::from("/tmp/k8s-ovn-ovs/v2/prepull.ps1"),
            prepull_remote_dir: "c:\\".to_string(),
        }
    }
}

/// `[timeouts]` section, all values in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    pub command_secs: u64,
    pub playbook_secs: u64,
    pub build_secs: u64,
    pub password_timeout_secs: u64,
    pub password_poll_interval_secs: u64,
    pub probe_connect_secs: u64,
    pub probe_sleep_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            command_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            playbook_secs: DEFAULT_PLAYBOOK_TIMEOUT_SECS,
            build_secs: DEFAULT_BUILD_TIMEOUT_SECS,
            password_timeout_secs: 1800,
            password_poll_interval_secs: 10,
            probe_connect_secs: 5,
            probe_sleep_secs: 5,
            probe_timeout_secs: 600,
        }
    }
}
