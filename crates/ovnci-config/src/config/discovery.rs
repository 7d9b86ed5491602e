use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ovnci_utils::error::{ConfigError, OvnCiError};

use super::{
    AnsibleConfig, CliArgs, ClusterConfig, Config, ConfigSource, EnvironmentConfig,
    KubernetesConfig, NodeGroupConfig, OpenStackConfig, TimeoutsConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    cluster: Option<ClusterConfig>,
    linux: Option<NodeGroupConfig>,
    windows: Option<NodeGroupConfig>,
    openstack: Option<OpenStackConfig>,
    ansible: Option<AnsibleConfig>,
    kubernetes: Option<KubernetesConfig>,
    environment: Option<EnvironmentConfig>,
    timeouts: Option<TimeoutsConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, OvnCiError> {
        let start_dir = std::env::current_dir()
            .map_err(|e| OvnCiError::filesystem(".", format!("current directory: {e}")))?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    /// Validation is structural only; per-command requirements are checked by
    /// [`Config::require_for_up`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, OvnCiError> {
        let mut config = Config::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            config.apply_file(file_config, ConfigSource::ConfigFile(path.clone()));
        }

        config.apply_cli(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.ovnci/config.toml`.
    ///
    /// Stops at a repository root (`.git`) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".ovnci").join("config.toml");
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists() {
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, OvnCiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to parse {}: {e}", path.display())).into()
        })
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        let mark = |attribution: &mut HashMap<String, ConfigSource>, section: &str| {
            attribution.insert(section.to_string(), source.clone());
        };

        if let Some(cluster) = file.cluster {
            self.cluster = cluster;
            mark(&mut self.source_attribution, "cluster");
        }
        if let Some(linux) = file.linux {
            self.linux = linux;
            mark(&mut self.source_attribution, "linux");
        }
        if let Some(windows) = file.windows {
            self.windows = windows;
            mark(&mut self.source_attribution, "windows");
        }
        if let Some(openstack) = file.openstack {
            self.openstack = openstack;
            mark(&mut self.source_attribution, "openstack");
        }
        if let Some(ansible) = file.ansible {
            self.ansible = ansible;
            mark(&mut self.source_attribution, "ansible");
        }
        if let Some(kubernetes) = file.kubernetes {
            self.kubernetes = kubernetes;
            mark(&mut self.source_attribution, "kubernetes");
        }
        if let Some(environment) = file.environment {
            self.environment = environment;
            mark(&mut self.source_attribution, "environment");
        }
        if let Some(timeouts) = file.timeouts {
            self.timeouts = timeouts;
            mark(&mut self.source_attribution, "timeouts");
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        fn set<T: Clone>(
            attribution: &mut HashMap<String, ConfigSource>,
            key: &str,
            target: &mut T,
            value: Option<&T>,
        ) {
            if let Some(value) = value {
                *target = value.clone();
                attribution.insert(key.to_string(), ConfigSource::Cli);
            }
        }

        fn set_some<T: Clone>(
            attribution: &mut HashMap<String, ConfigSource>,
            key: &str,
            target: &mut Option<T>,
            value: &Option<T>,
        ) {
            if let Some(value) = value {
                *target = Some(value.clone());
                attribution.insert(key.to_string(), ConfigSource::Cli);
            }
        }

        let attr = &mut self.source_attribution;

        set(attr, "cluster.name", &mut self.cluster.name, cli.cluster_name.as_ref());
        set(attr, "cluster.log_path", &mut self.cluster.log_path, cli.log_path.as_ref());

        if !cli.linux_vms.is_empty() {
            self.linux.vms = cli.linux_vms.clone();
            attr.insert("linux.vms".to_string(), ConfigSource::Cli);
        }
        if !cli.windows_vms.is_empty() {
            self.windows.vms = cli.windows_vms.clone();
            attr.insert("windows.vms".to_string(), ConfigSource::Cli);
        }

        set_some(attr, "linux.flavor", &mut self.linux.flavor, &cli.linux_flavor);
        set_some(attr, "linux.image_id", &mut self.linux.image_id, &cli.linux_image_id);
        set_some(attr, "linux.user_data", &mut self.linux.user_data, &cli.linux_user_data);
        set_some(attr, "windows.flavor", &mut self.windows.flavor, &cli.windows_flavor);
        set_some(attr, "windows.image_id", &mut self.windows.image_id, &cli.windows_image_id);
        set_some(attr, "windows.user_data", &mut self.windows.user_data, &cli.windows_user_data);

        set_some(attr, "openstack.key_name", &mut self.openstack.key_name, &cli.key_name);
        set_some(attr, "openstack.key_file", &mut self.openstack.key_file, &cli.key_file);
        set_some(attr, "openstack.internal_net", &mut self.openstack.internal_net, &cli.internal_net);
        set_some(attr, "openstack.external_net", &mut self.openstack.external_net, &cli.external_net);

        set(attr, "ansible.repo", &mut self.ansible.repo, cli.ansible_repo.as_ref());
        set(attr, "ansible.branch", &mut self.ansible.branch, cli.ansible_branch.as_ref());
        set(attr, "kubernetes.repo", &mut self.kubernetes.repo, cli.k8s_repo.as_ref());
        set(attr, "kubernetes.branch", &mut self.kubernetes.branch, cli.k8s_branch.as_ref());

        if cli.no_reboot {
            self.environment.reboot_windows = false;
            attr.insert("environment.reboot_windows".to_string(), ConfigSource::Cli);
        }
    }
}
