use camino::Utf8PathBuf;
use std::path::PathBuf;

/// CLI arguments for configuration override
///
/// Every field left `None` (or empty) falls through to the config file and
/// then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub cluster_name: Option<String>,
    pub log_path: Option<Utf8PathBuf>,

    pub linux_vms: Vec<String>,
    pub linux_flavor: Option<String>,
    pub linux_image_id: Option<String>,
    pub linux_user_data: Option<Utf8PathBuf>,

    pub windows_vms: Vec<String>,
    pub windows_flavor: Option<String>,
    pub windows_image_id: Option<String>,
    pub windows_user_data: Option<Utf8PathBuf>,

    pub key_name: Option<String>,
    pub key_file: Option<Utf8PathBuf>,
    pub internal_net: Option<String>,
    pub external_net: Option<String>,

    pub ansible_repo: Option<String>,
    pub ansible_branch: Option<String>,

    pub k8s_repo: Option<String>,
    pub k8s_branch: Option<String>,

    pub no_reboot: bool,
}
