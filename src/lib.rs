//! ovnci: provision mixed Linux/Windows Kubernetes clusters on OpenStack for
//! CI runs, bootstrap them with the ovn-kubernetes Ansible playbook and export
//! the environment the e2e suites need.
//!
//! The workspace is split into:
//!
//! - `ovnci-runner`: argv-only process execution
//! - `ovnci-utils`: errors, exit codes, logging and file helpers
//! - `ovnci-config`: layered configuration
//! - `ovnci-engine`: the cluster lifecycle
//!
//! This crate adds the `ovnci` command line on top.

pub mod cli;
pub mod doctor;

pub use ovnci_config::{CliArgs, Config};
pub use ovnci_engine::{ClusterLifecycle, LifecycleState, TestEnvironment};
pub use ovnci_utils::{ClusterError, ConfigError, ExitCode, OvnCiError};
