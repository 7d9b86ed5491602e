//! Provisioned nodes and the cluster they form.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

use ovnci_utils::error::{ClusterError, Result};

/// Operating system family of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Windows,
}

/// Per-OS node data.
#[derive(Clone, PartialEq, Eq)]
pub enum NodeKind {
    Linux,
    /// The admin password is filled in once the cloud exposes it.
    Windows { admin_password: Option<String> },
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::Windows { admin_password } => f
                .debug_struct("Windows")
                .field(
                    "admin_password",
                    &admin_password.as_ref().map(|_| "<redacted>"),
                )
                .finish(),
        }
    }
}

/// One provisioned VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub floating_ip: Option<IpAddr>,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>, os: OsFamily) -> Self {
        let kind = match os {
            OsFamily::Linux => NodeKind::Linux,
            OsFamily::Windows => NodeKind::Windows {
                admin_password: None,
            },
        };
        Self {
            name: name.into(),
            floating_ip: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_floating_ip(mut self, ip: IpAddr) -> Self {
        self.floating_ip = Some(ip);
        self
    }

    #[must_use]
    pub fn os(&self) -> OsFamily {
        match self.kind {
            NodeKind::Linux => OsFamily::Linux,
            NodeKind::Windows { .. } => OsFamily::Windows,
        }
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os() == OsFamily::Windows
    }

    /// Floating IP, or an invariant violation if none was attached.
    pub fn require_floating_ip(&self) -> Result<IpAddr> {
        self.floating_ip.ok_or_else(|| {
            ClusterError::MissingFloatingIp {
                node: self.name.clone(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn admin_password(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Windows { admin_password } => admin_password.as_deref(),
            NodeKind::Linux => None,
        }
    }

    /// Record the admin password. No-op on Linux nodes.
    pub fn set_admin_password(&mut self, password: String) {
        if let NodeKind::Windows { admin_password } = &mut self.kind {
            *admin_password = Some(password);
        }
    }
}

/// Role of a node in the Kubernetes cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRole {
    LinuxMaster,
    LinuxMinion,
    WindowsMinion,
}

/// Nodes in creation order, partitioned by OS. `linux_nodes[0]` is the master.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cluster {
    pub linux_nodes: Vec<Node>,
    pub windows_nodes: Vec<Node>,
}

impl Cluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node to the partition matching its OS.
    pub fn push(&mut self, node: Node) {
        match node.os() {
            OsFamily::Linux => self.linux_nodes.push(node),
            OsFamily::Windows => self.windows_nodes.push(node),
        }
    }

    pub fn master(&self) -> Result<&Node> {
        self.linux_nodes.first().ok_or_else(|| {
            ClusterError::MalformedCluster {
                reason: "cluster has no Linux nodes to act as master".to_string(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn linux_minions(&self) -> &[Node] {
        self.linux_nodes.get(1..).unwrap_or(&[])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linux_nodes.is_empty() && self.windows_nodes.is_empty()
    }

    /// All nodes, Linux first, each in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.linux_nodes.iter().chain(self.windows_nodes.iter())
    }

    /// All nodes paired with their role.
    pub fn nodes_with_roles(&self) -> impl Iterator<Item = (NodeRole, &Node)> {
        let linux = self.linux_nodes.iter().enumerate().map(|(i, node)| {
            let role = if i == 0 {
                NodeRole::LinuxMaster
            } else {
                NodeRole::LinuxMinion
            };
            (role, node)
        });
        let windows = self
            .windows_nodes
            .iter()
            .map(|node| (NodeRole::WindowsMinion, node));
        linux.chain(windows)
    }
}

/// Snapshot of a provisioned cluster, written to `cluster.json`.
///
/// Carries no credentials.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterRecord {
    pub cluster_name: String,
    pub created_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub role: NodeRole,
    pub os: OsFamily,
    pub floating_ip: Option<IpAddr>,
}

impl ClusterRecord {
    #[must_use]
    pub fn from_cluster(cluster_name: &str, cluster: &Cluster) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            created_at: Utc::now(),
            nodes: cluster
                .nodes_with_roles()
                .map(|(role, node)| NodeRecord {
                    name: node.name.clone(),
                    role,
                    os: node.os(),
                    floating_ip: node.floating_ip,
                })
                .collect(),
        }
    }
}
