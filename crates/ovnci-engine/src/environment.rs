//! The test environment handed to downstream suites.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use ovnci_utils::atomic_write::write_file_atomic;
use ovnci_utils::error::{OvnCiError, Result};

/// Local paths and endpoint of a ready cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestEnvironment {
    pub kubeconfig_path: Utf8PathBuf,
    pub ca_cert_path: Utf8PathBuf,
    pub admin_cert_path: Utf8PathBuf,
    pub admin_key_path: Utf8PathBuf,
    pub master_dns_name: String,
    pub master_url: String,
}

impl TestEnvironment {
    /// Environment for a master reachable as `master_alias`, with TLS
    /// material stored under `tls_dir`.
    #[must_use]
    pub fn new(master_alias: &str, kubeconfig_path: &Utf8Path, tls_dir: &Utf8Path) -> Self {
        Self {
            kubeconfig_path: kubeconfig_path.to_path_buf(),
            ca_cert_path: tls_dir.join("ca.pem"),
            admin_cert_path: tls_dir.join("admin.pem"),
            admin_key_path: tls_dir.join("admin-key.pem"),
            master_dns_name: master_alias.to_string(),
            master_url: format!("https://{master_alias}"),
        }
    }

    /// Variables the e2e suites read, in a fixed order.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("KUBE_MASTER", "local".to_string()),
            ("KUBE_MASTER_IP", self.master_dns_name.clone()),
            ("KUBE_MASTER_URL", self.master_url.clone()),
            ("KUBECONFIG", self.kubeconfig_path.to_string()),
        ]
    }

    /// `export KEY=value` lines for sourcing from a shell.
    #[must_use]
    pub fn export_script(&self) -> String {
        self.env_vars()
            .into_iter()
            .map(|(key, value)| format!("export {key}={}\n", shell_quote(&value)))
            .collect()
    }

    /// Write [`export_script`](Self::export_script) to `path`.
    pub fn write_export_script(&self, path: &Utf8Path) -> Result<()> {
        write_file_atomic(path, &self.export_script())
            .map_err(|e| OvnCiError::filesystem(path, format!("{e:#}")))
    }
}

fn shell_quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=@".contains(c));
    if plain && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
