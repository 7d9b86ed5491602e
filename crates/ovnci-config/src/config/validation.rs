use regex::Regex;
use std::sync::LazyLock;

use ovnci_utils::error::{ConfigError, OvnCiError};

use super::{Config, NodeGroupConfig};

/// Upper bound for any single timeout (24 hours)
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// VM names end up as inventory hosts and /etc/hosts entries.
static VM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap());

fn invalid(key: &str, value: impl Into<String>) -> OvnCiError {
    OvnCiError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values that must hold for every command.
    pub(crate) fn validate(&self) -> Result<(), OvnCiError> {
        let t = &self.timeouts;
        for (key, value) in [
            ("timeouts.command_secs", t.command_secs),
            ("timeouts.playbook_secs", t.playbook_secs),
            ("timeouts.build_secs", t.build_secs),
            ("timeouts.password_timeout_secs", t.password_timeout_secs),
            ("timeouts.probe_connect_secs", t.probe_connect_secs),
            ("timeouts.probe_timeout_secs", t.probe_timeout_secs),
            ("timeouts.password_poll_interval_secs", t.password_poll_interval_secs),
            ("timeouts.probe_sleep_secs", t.probe_sleep_secs),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
            if value > MAX_TIMEOUT_SECS {
                return Err(invalid(key, "exceeds maximum limit of 86400 seconds (24 hours)"));
            }
        }

        if t.password_poll_interval_secs > t.password_timeout_secs {
            return Err(invalid(
                "timeouts.password_poll_interval_secs",
                "must not exceed password_timeout_secs",
            ));
        }

        if !self.cluster.name.is_empty() && !VM_NAME.is_match(&self.cluster.name) {
            return Err(invalid(
                "cluster.name",
                format!("'{}' is not a valid host name prefix", self.cluster.name),
            ));
        }

        for (key, group) in [("linux.vms", &self.linux), ("windows.vms", &self.windows)] {
            for name in &group.vms {
                if !VM_NAME.is_match(name) {
                    return Err(invalid(key, format!("'{name}' is not a valid host name")));
                }
            }
        }

        if self.ansible.master_alias.trim().is_empty() {
            return Err(invalid("ansible.master_alias", "must not be empty"));
        }

        Ok(())
    }

    /// Check the options `up` cannot run without.
    pub fn require_for_up(&self) -> Result<(), OvnCiError> {
        if self.linux.vms.is_empty() {
            return Err(ConfigError::MissingRequired("linux.vms (--linux-vm)".to_string()).into());
        }
        if self.openstack.key_file.is_none() {
            return Err(
                ConfigError::MissingRequired("openstack.key_file (--key-file)".to_string()).into(),
            );
        }
        if self.openstack.key_name.is_none() {
            return Err(
                ConfigError::MissingRequired("openstack.key_name (--key-name)".to_string()).into(),
            );
        }
        if self.openstack.internal_net.is_none() {
            return Err(ConfigError::MissingRequired(
                "openstack.internal_net (--internal-net)".to_string(),
            )
            .into());
        }

        require_group("linux", &self.linux)?;
        require_group("windows", &self.windows)?;
        Ok(())
    }
}

fn require_group(section: &str, group: &NodeGroupConfig) -> Result<(), OvnCiError> {
    if group.vms.is_empty() {
        return Ok(());
    }
    if group.flavor.is_none() {
        return Err(ConfigError::MissingRequired(format!("{section}.flavor")).into());
    }
    if group.image_id.is_none() {
        return Err(ConfigError::MissingRequired(format!("{section}.image_id")).into());
    }
    Ok(())
}
