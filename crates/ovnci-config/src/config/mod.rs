//! Configuration management for ovnci
//!
//! Hierarchical configuration with discovery and precedence: CLI > file >
//! defaults. The TOML file lives at `.ovnci/config.toml` and carries the
//! `[cluster]`, `[linux]`, `[windows]`, `[openstack]`, `[ansible]`,
//! `[kubernetes]`, `[environment]` and `[timeouts]` sections.
//!
//! ```toml
//! [cluster]
//! name = "ci-1234"
//! log_path = "/var/log/ovnci"
//!
//! [linux]
//! vms = ["master", "node1"]
//! flavor = "m1.large"
//! image_id = "ubuntu-16.04"
//!
//! [windows]
//! vms = ["winnode1"]
//! flavor = "m1.large"
//! image_id = "ws2016"
//!
//! [openstack]
//! key_name = "ci-key"
//! key_file = "/root/.ssh/id_rsa"
//! internal_net = "private"
//! external_net = "public"
//! ```

mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use cli_args::CliArgs;
pub use model::*;

impl Config {
    /// Cloud instance name for a configured VM name.
    ///
    /// With a cluster name set, instances are named `<cluster>-<vm>`.
    #[must_use]
    pub fn instance_name(&self, vm: &str) -> String {
        if self.cluster.name.is_empty() {
            vm.to_string()
        } else {
            format!("{}-{}", self.cluster.name, vm)
        }
    }

    /// Instance names of every configured VM, Linux first.
    #[must_use]
    pub fn all_instance_names(&self) -> Vec<String> {
        self.linux
            .vms
            .iter()
            .chain(self.windows.vms.iter())
            .map(|vm| self.instance_name(vm))
            .collect()
    }
}
