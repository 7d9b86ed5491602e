//! Environment health checks for `ovnci doctor`.

use serde::Serialize;
use std::path::Path;

use ovnci_config::Config;

/// Status of a health check
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

/// Result of all checks plus the effective configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorOutput {
    /// False if any check failed
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
    /// `key -> (value, source)`
    pub config: std::collections::BTreeMap<String, (String, String)>,
}

/// Tools the workflow spawns, by configured name.
fn required_tools(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("openstack", config.openstack.openstack_bin.clone()),
        ("nova", config.openstack.nova_bin.clone()),
        ("ansible", "ansible".to_string()),
        ("ansible-playbook", "ansible-playbook".to_string()),
        ("git", "git".to_string()),
        ("make", "make".to_string()),
    ]
}

fn check_tool(name: &str, binary: &str) -> DoctorCheck {
    match which::which(binary) {
        Ok(path) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: path.display().to_string(),
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: format!("'{binary}' not found on PATH: {e}"),
        },
    }
}

fn check_file(name: &str, path: Option<&Path>, missing_status: CheckStatus) -> DoctorCheck {
    let (status, details) = match path {
        None => (CheckStatus::Warn, "not configured".to_string()),
        Some(path) if path.is_file() => (CheckStatus::Pass, path.display().to_string()),
        Some(path) => (missing_status, format!("{} does not exist", path.display())),
    };
    DoctorCheck {
        name: name.to_string(),
        status,
        details,
    }
}

/// Run every check against `config`.
#[must_use]
pub fn run_checks(config: &Config) -> DoctorOutput {
    let mut checks: Vec<DoctorCheck> = required_tools(config)
        .iter()
        .map(|(name, binary)| check_tool(name, binary))
        .collect();

    checks.push(check_file(
        "key_file",
        config.openstack.key_file.as_deref().map(|p| p.as_std_path()),
        CheckStatus::Fail,
    ));
    // Only needed once Windows nodes exist.
    checks.push(check_file(
        "prepull_script",
        Some(config.environment.prepull_script.as_std_path()),
        if config.windows.vms.is_empty() {
            CheckStatus::Warn
        } else {
            CheckStatus::Fail
        },
    ));

    let ok = checks.iter().all(|c| c.status != CheckStatus::Fail);
    DoctorOutput {
        ok,
        checks,
        config: config.effective_config(),
    }
}

/// Human-readable report.
#[must_use]
pub fn render_report(output: &DoctorOutput) -> String {
    let mut report = String::from("ovnci environment health check\n\n");
    for check in &output.checks {
        report.push_str(&format!(
            "  [{:<4}] {:<18} {}\n",
            check.status.to_string(),
            check.name,
            check.details
        ));
    }

    report.push_str("\nEffective configuration:\n");
    for (key, (value, source)) in &output.config {
        report.push_str(&format!("  {key} = {value} ({source})\n"));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_missing_tool_fails() {
        let check = check_tool("openstack", "ovnci-definitely-not-a-binary");
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.contains("not found on PATH"));
    }

    #[test]
    fn test_key_file_checks() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, "key").unwrap();

        assert_eq!(check_file("key_file", None, CheckStatus::Fail).status, CheckStatus::Warn);
        assert_eq!(check_file("key_file", Some(key.as_path()), CheckStatus::Fail).status, CheckStatus::Pass);
        assert_eq!(
            check_file("key_file", Some(dir.path().join("nope").as_path()), CheckStatus::Fail).status,
            CheckStatus::Fail
        );
    }

    #[test]
    fn test_missing_tools_make_output_not_ok() {
        let mut config = Config::default();
        config.openstack.openstack_bin = "ovnci-missing-openstack".to_string();
        config.openstack.key_file = Some(Utf8PathBuf::from("/nonexistent/key"));

        let output = run_checks(&config);
        assert!(!output.ok);
        assert!(output.config.contains_key("ansible.repo"));

        let report = render_report(&output);
        assert!(report.contains("[fail] openstack"));
        assert!(report.contains("ansible.branch = master (default)"));
    }

    #[test]
    fn test_prepull_script_only_required_with_windows_vms() {
        let mut config = Config::default();
        config.environment.prepull_script = Utf8PathBuf::from("/nonexistent/prepull.ps1");

        let status = |config: &Config| {
            run_checks(config)
                .checks
                .into_iter()
                .find(|c| c.name == "prepull_script")
                .map(|c| c.status)
        };
        assert_eq!(status(&config), Some(CheckStatus::Warn));

        config.windows.vms = vec!["winnode1".to_string()];
        assert_eq!(status(&config), Some(CheckStatus::Fail));
    }
}
