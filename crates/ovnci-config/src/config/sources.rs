use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(config: &Config, key: &str) -> String {
    // A CLI override is recorded per key, a file per section.
    let section = key.split('.').next().unwrap_or(key);
    config
        .source_attribution
        .get(key)
        .or_else(|| config.source_attribution.get(section))
        .unwrap_or(&ConfigSource::Defaults)
        .to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, for `ovnci doctor`.
    ///
    /// Secrets never appear here; the key file is shown by path only.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut entries = BTreeMap::new();
        let mut add = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                entries.insert(key.to_string(), (value, source_label(self, key)));
            }
        };

        add("cluster.name", Some(self.cluster.name.clone()));
        add("cluster.log_path", Some(self.cluster.log_path.to_string()));
        add("linux.vms", Some(self.linux.vms.join(", ")));
        add("linux.flavor", self.linux.flavor.clone());
        add("linux.image_id", self.linux.image_id.clone());
        add("windows.vms", Some(self.windows.vms.join(", ")));
        add("windows.flavor", self.windows.flavor.clone());
        add("windows.image_id", self.windows.image_id.clone());
        add("openstack.key_name", self.openstack.key_name.clone());
        add("openstack.key_file", self.openstack.key_file.as_ref().map(ToString::to_string));
        add("openstack.internal_net", self.openstack.internal_net.clone());
        add("openstack.external_net", self.openstack.external_net.clone());
        add("ansible.repo", Some(self.ansible.repo.clone()));
        add("ansible.branch", Some(self.ansible.branch.clone()));
        add("ansible.checkout_path", Some(self.ansible.checkout_path.to_string()));
        add("kubernetes.repo", Some(self.kubernetes.repo.clone()));
        add("kubernetes.branch", Some(self.kubernetes.branch.clone()));
        add(
            "environment.reboot_windows",
            Some(self.environment.reboot_windows.to_string()),
        );

        entries
    }
}
