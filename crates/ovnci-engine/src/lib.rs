//! Cluster lifecycle engine for ovnci.
//!
//! [`ClusterLifecycle`] sequences the cloud ([`CloudProvider`]), the ansible
//! playbook ([`AnsibleProvisioner`]), ad-hoc remote actions ([`RemoteExec`])
//! and the workload binaries ([`ArtifactSource`]) to bring a mixed
//! Linux/Windows Kubernetes cluster up and tear it down again.

pub mod artifacts;
pub mod cloud;
pub mod environment;
pub mod git;
pub mod inventory;
pub mod kubeconfig;
pub mod lifecycle;
pub mod node;
pub mod provisioner;
pub mod remote;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use artifacts::{ArtifactSource, KubernetesSource};
pub use cloud::{CloudProvider, InstanceSpec, OpenStackCli, PollPolicy};
pub use environment::TestEnvironment;
pub use inventory::{InventoryArtifact, InventoryBuilder, InventoryLayout};
pub use lifecycle::{ClusterLifecycle, LifecycleState};
pub use node::{Cluster, ClusterRecord, Node, NodeKind, NodeRole, OsFamily};
pub use provisioner::AnsibleProvisioner;
pub use remote::{ProbeSettings, RemoteExec};
