//! Ansible inventory generation.
//!
//! All text artifacts are rendered from templates with typed contexts. The
//! environment runs with strict undefined behaviour so a missing context field
//! fails rendering instead of producing an empty string.

use camino::{Utf8Path, Utf8PathBuf};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::info;

use ovnci_utils::atomic_write::{append_file, write_file_atomic};
use ovnci_utils::error::{ClusterError, OvnCiError, Result};

use crate::node::{Cluster, Node};

const GROUPS_TEMPLATE: &str = "[kube-master]
{{ master }}

[kube-minions-linux]
{{ linux_minions | join(\"\\n\") }}

[kube-minions-windows]
{{ windows_minions | join(\"\\n\") }}
";

const HOST_VARS_TEMPLATE: &str = "ansible_user: {{ user }}
ansible_password: {{ password | tojson }}
";

const HOSTS_TEMPLATE: &str = "{% for entry in entries -%}
{{ entry.ip }} {{ entry.name }}{% if entry.alias %} {{ entry.alias }}{% endif %}
{% endfor %}";

const ANSIBLE_CFG_TEMPLATE: &str = "log_path={{ log_file }}


[ssh_connection]
ssh_args=-o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null
";

#[derive(Serialize)]
struct GroupsContext<'a> {
    master: &'a str,
    linux_minions: Vec<&'a str>,
    windows_minions: Vec<&'a str>,
}

#[derive(Serialize)]
struct HostVarsContext<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct HostsEntry<'a> {
    ip: String,
    name: &'a str,
    alias: Option<&'a str>,
}

#[derive(Serialize)]
struct HostsContext<'a> {
    entries: Vec<HostsEntry<'a>>,
}

#[derive(Serialize)]
struct AnsibleCfgContext {
    log_file: String,
}

/// Credentials fragment for one Windows host.
#[derive(Clone, PartialEq, Eq)]
pub struct HostVars {
    pub host: String,
    pub content: String,
}

impl std::fmt::Debug for HostVars {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostVars")
            .field("host", &self.host)
            .field("content", &"<redacted>")
            .finish()
    }
}

/// Rendered inventory for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryArtifact {
    /// `inventory/hosts` group file
    pub groups: String,
    /// One fragment per Windows host
    pub host_vars: Vec<HostVars>,
    /// Lines appended to the hosts file, one per node
    pub hosts_entries: String,
    /// Block appended to `ansible.cfg`
    pub ansible_cfg: String,
}

/// Where an [`InventoryArtifact`] is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLayout {
    pub groups_file: Utf8PathBuf,
    pub host_vars_dir: Utf8PathBuf,
    pub hosts_file: Utf8PathBuf,
    pub ansible_cfg: Utf8PathBuf,
}

impl InventoryLayout {
    /// Standard layout inside a playbook root (`<checkout>/contrib`).
    #[must_use]
    pub fn for_playbook_root(playbook_root: &Utf8Path, hosts_file: &Utf8Path) -> Self {
        Self {
            groups_file: playbook_root.join("inventory/hosts"),
            host_vars_dir: playbook_root.join("inventory/host_vars"),
            hosts_file: hosts_file.to_path_buf(),
            ansible_cfg: playbook_root.join("ansible.cfg"),
        }
    }
}

/// Renders [`InventoryArtifact`]s from cluster state.
pub struct InventoryBuilder {
    env: Environment<'static>,
    windows_admin: String,
    master_alias: String,
    log_path: Utf8PathBuf,
}

impl InventoryBuilder {
    pub fn new(
        windows_admin: impl Into<String>,
        master_alias: impl Into<String>,
        log_path: impl Into<Utf8PathBuf>,
    ) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        for (name, source) in [
            ("groups", GROUPS_TEMPLATE),
            ("host_vars", HOST_VARS_TEMPLATE),
            ("hosts", HOSTS_TEMPLATE),
            ("ansible_cfg", ANSIBLE_CFG_TEMPLATE),
        ] {
            env.add_template(name, source).map_err(|e| template_error(name, &e))?;
        }

        Ok(Self {
            env,
            windows_admin: windows_admin.into(),
            master_alias: master_alias.into(),
            log_path: log_path.into(),
        })
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|e| template_error(name, &e))
    }

    /// Render every artifact for `cluster`.
    ///
    /// Fails with `MalformedCluster` when there is no Linux node, before any
    /// other check.
    pub fn build(&self, cluster: &Cluster) -> Result<InventoryArtifact> {
        let master = cluster.master()?;

        let groups = self.render(
            "groups",
            GroupsContext {
                master: &master.name,
                linux_minions: cluster.linux_minions().iter().map(|n| n.name.as_str()).collect(),
                windows_minions: cluster.windows_nodes.iter().map(|n| n.name.as_str()).collect(),
            },
        )?;

        let host_vars = cluster
            .windows_nodes
            .iter()
            .map(|node| self.host_vars(node))
            .collect::<Result<Vec<_>>>()?;

        let entries = cluster
            .nodes()
            .enumerate()
            .map(|(i, node)| -> Result<HostsEntry<'_>> {
                Ok(HostsEntry {
                    ip: node.require_floating_ip()?.to_string(),
                    name: &node.name,
                    alias: (i == 0).then_some(self.master_alias.as_str()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let hosts_entries = self.render("hosts", HostsContext { entries })?;

        let ansible_cfg = self.render(
            "ansible_cfg",
            AnsibleCfgContext {
                log_file: self.log_path.join("ansible-deploy.log").to_string(),
            },
        )?;

        Ok(InventoryArtifact {
            groups,
            host_vars,
            hosts_entries,
            ansible_cfg,
        })
    }

    fn host_vars(&self, node: &Node) -> Result<HostVars> {
        let password = node
            .admin_password()
            .ok_or_else(|| ClusterError::MissingCredentials {
                node: node.name.clone(),
            })?;
        let content = self.render(
            "host_vars",
            HostVarsContext {
                user: &self.windows_admin,
                password,
            },
        )?;
        Ok(HostVars {
            host: node.name.clone(),
            content,
        })
    }
}

fn template_error(name: &str, err: &minijinja::Error) -> OvnCiError {
    ClusterError::Template {
        name: name.to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Write the group file and host_vars fragments (overwriting), then append
/// the hosts entries and the ansible.cfg block.
pub fn write(artifact: &InventoryArtifact, layout: &InventoryLayout) -> Result<()> {
    let fs_error = |path: &Utf8Path, e: anyhow::Error| OvnCiError::filesystem(path, format!("{e:#}"));

    info!(path = %layout.groups_file, "Writing ansible inventory");
    write_file_atomic(&layout.groups_file, &artifact.groups)
        .map_err(|e| fs_error(&layout.groups_file, e))?;

    for vars in &artifact.host_vars {
        let path = layout.host_vars_dir.join(&vars.host);
        info!(path = %path, "Writing host_vars");
        write_file_atomic(&path, &vars.content).map_err(|e| fs_error(&path, e))?;
    }

    for line in artifact.hosts_entries.lines() {
        info!(entry = %line, hosts_file = %layout.hosts_file, "Adding hosts entry");
    }
    append_file(&layout.hosts_file, &artifact.hosts_entries)
        .map_err(|e| fs_error(&layout.hosts_file, e))?;

    append_file(&layout.ansible_cfg, &artifact.ansible_cfg)
        .map_err(|e| fs_error(&layout.ansible_cfg, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::OsFamily;
    use tempfile::TempDir;

    fn builder() -> InventoryBuilder {
        InventoryBuilder::new("Admin", "kubernetes", "/var/log/ovnci").unwrap()
    }

    fn linux(name: &str, ip: &str) -> Node {
        Node::new(name, OsFamily::Linux).with_floating_ip(ip.parse().unwrap())
    }

    fn windows(name: &str, ip: &str, password: &str) -> Node {
        let mut node = Node::new(name, OsFamily::Windows).with_floating_ip(ip.parse().unwrap());
        node.set_admin_password(password.to_string());
        node
    }

    fn sample_cluster() -> Cluster {
        let mut cluster = Cluster::new();
        cluster.push(linux("master", "10.0.0.5"));
        cluster.push(linux("node1", "10.0.0.6"));
        cluster.push(windows("winnode1", "10.0.0.7", "Pa55"));
        cluster
    }

    #[test]
    fn test_groups_file_layout() {
        let artifact = builder().build(&sample_cluster()).unwrap();
        assert_eq!(
            artifact.groups,
            "[kube-master]\nmaster\n\n[kube-minions-linux]\nnode1\n\n[kube-minions-windows]\nwinnode1\n"
        );
    }

    #[test]
    fn test_groups_with_master_only() {
        let mut cluster = Cluster::new();
        cluster.push(linux("master", "10.0.0.5"));
        let artifact = builder().build(&cluster).unwrap();

        assert_eq!(
            artifact.groups,
            "[kube-master]\nmaster\n\n[kube-minions-linux]\n\n\n[kube-minions-windows]\n\n"
        );
        assert!(artifact.host_vars.is_empty());
    }

    #[test]
    fn test_host_vars_for_windows_only() {
        let artifact = builder().build(&sample_cluster()).unwrap();

        assert_eq!(artifact.host_vars.len(), 1);
        assert_eq!(artifact.host_vars[0].host, "winnode1");
        assert_eq!(
            artifact.host_vars[0].content,
            "ansible_user: Admin\nansible_password: \"Pa55\"\n"
        );
    }

    #[test]
    fn test_password_with_yaml_metacharacters_is_quoted() {
        let mut cluster = Cluster::new();
        cluster.push(linux("master", "10.0.0.5"));
        cluster.push(windows("w", "10.0.0.9", "a: #b\"c"));

        let artifact = builder().build(&cluster).unwrap();
        let content = &artifact.host_vars[0].content;
        let password_line = content.lines().nth(1).unwrap();
        let value = password_line.trim_start_matches("ansible_password: ");
        assert_eq!(serde_json::from_str::<String>(value).unwrap(), "a: #b\"c");
    }

    #[test]
    fn test_hosts_entries_alias_master_only() {
        let artifact = builder().build(&sample_cluster()).unwrap();
        assert_eq!(
            artifact.hosts_entries,
            "10.0.0.5 master kubernetes\n10.0.0.6 node1\n10.0.0.7 winnode1\n"
        );
    }

    #[test]
    fn test_ansible_cfg_block() {
        let artifact = builder().build(&sample_cluster()).unwrap();
        assert_eq!(
            artifact.ansible_cfg,
            "log_path=/var/log/ovnci/ansible-deploy.log\n\n\n[ssh_connection]\n\
             ssh_args=-o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null\n"
        );
    }

    #[test]
    fn test_no_linux_nodes_is_malformed() {
        let mut cluster = Cluster::new();
        // Windows node without password: MalformedCluster still wins
        cluster.push(Node::new("w", OsFamily::Windows));

        assert!(matches!(
            builder().build(&cluster),
            Err(OvnCiError::Cluster(ClusterError::MalformedCluster { .. }))
        ));
    }

    #[test]
    fn test_missing_password_is_invariant() {
        let mut cluster = Cluster::new();
        cluster.push(linux("master", "10.0.0.5"));
        cluster.push(Node::new("w", OsFamily::Windows).with_floating_ip("10.0.0.8".parse().unwrap()));

        match builder().build(&cluster) {
            Err(OvnCiError::Cluster(err @ ClusterError::MissingCredentials { .. })) => {
                assert!(err.is_invariant_violation());
            }
            other => panic!("Expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn test_write_overwrites_and_appends() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let hosts_file = root.join("etc_hosts");
        std::fs::write(&hosts_file, "127.0.0.1 localhost\n").unwrap();
        let layout = InventoryLayout::for_playbook_root(&root.join("contrib"), &hosts_file);

        let artifact = builder().build(&sample_cluster()).unwrap();
        write(&artifact, &layout).unwrap();
        write(&artifact, &layout).unwrap();

        // Overwritten
        assert_eq!(std::fs::read_to_string(&layout.groups_file).unwrap(), artifact.groups);
        assert!(layout.host_vars_dir.join("winnode1").is_file());
        // Appended twice
        let hosts = std::fs::read_to_string(&hosts_file).unwrap();
        assert_eq!(hosts.lines().count(), 1 + 2 * 3);
        assert!(hosts.starts_with("127.0.0.1 localhost\n"));
    }

    #[test]
    fn test_write_keeps_unterminated_hosts_line_separate() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let hosts_file = root.join("etc_hosts");
        std::fs::write(&hosts_file, "127.0.0.1 localhost").unwrap();
        let layout = InventoryLayout::for_playbook_root(&root.join("contrib"), &hosts_file);
        std::fs::create_dir_all(layout.ansible_cfg.parent().unwrap()).unwrap();
        std::fs::write(&layout.ansible_cfg, "[defaults]\nforks=5").unwrap();

        let artifact = builder().build(&sample_cluster()).unwrap();
        write(&artifact, &layout).unwrap();

        let hosts = std::fs::read_to_string(&hosts_file).unwrap();
        assert_eq!(hosts.lines().count(), 1 + 3);
        assert!(hosts.starts_with("127.0.0.1 localhost\n"));
        let cfg = std::fs::read_to_string(&layout.ansible_cfg).unwrap();
        assert!(cfg.starts_with("[defaults]\nforks=5\n"));
    }
}
