use std::fmt;
use thiserror::Error;

pub use ovnci_runner::RunnerError;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `OvnCiError` is the error returned by every ovnci library operation. Workflow
/// failures from the cluster lifecycle ([`ClusterError`]) travel through it
/// unchanged, so callers can still match on the exact kind.
///
/// # Exit Code Mapping
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map errors to CLI exit codes:
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | No floating IP left in the pool |
/// | 4 | Windows admin password never became available |
/// | 5 | Host unreachable |
/// | 6 | Remote copy/exec failed |
/// | 7 | Playbook run failed |
/// | 8 | Cluster has no Linux master |
/// | 9 | Repository clone or workload build failed |
/// | 10 | Subprocess timed out |
/// | 70 | Cloud client failure |
/// | 1 | Other errors, including invariant violations |
#[derive(Error, Debug)]
pub enum OvnCiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Cluster(#[from] ClusterError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("File operation failed on {path}: {reason}")]
    Filesystem { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T, E = OvnCiError> = std::result::Result<T, E>;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Cloud,
    Connectivity,
    RemoteExecution,
    Provisioning,
    FileSystem,
    Process,
    /// Programming-invariant violations; these are bugs, not operator errors.
    Invariant,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Cloud => write!(f, "Cloud"),
            Self::Connectivity => write!(f, "Connectivity"),
            Self::RemoteExecution => write!(f, "Remote Execution"),
            Self::Provisioning => write!(f, "Provisioning"),
            Self::FileSystem => write!(f, "File System"),
            Self::Process => write!(f, "Process"),
            Self::Invariant => write!(f, "Internal Invariant"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files are TOML with [cluster], [linux], [windows], [openstack], [ansible], [kubernetes], [environment] and [timeouts] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' option has specific format requirements."
            )),
            Self::NotFound { .. } => Some(
                "ovnci searches for .ovnci/config.toml from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Remove unknown keys; every section rejects fields it does not know".to_string(),
            ],
            Self::MissingRequired(key) => vec![
                format!("Pass the matching command-line flag or set '{key}' in .ovnci/config.toml"),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                k if k.ends_with("_secs") => {
                    vec!["Use a positive number of seconds within the documented limit".to_string()]
                }
                _ => vec!["Remove the option to use the default value".to_string()],
            },
            Self::NotFound { .. } => vec![
                "Check the path given to --config".to_string(),
                "Omit --config to use discovery and built-in defaults".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Workflow errors raised while bringing a cluster up or down.
///
/// The first group are the expected failure modes of a provisioning run. The
/// last group are invariant violations: the workflow was driven out of order or
/// a record is missing data an earlier step guarantees.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("No floating IP available in pool '{pool}'")]
    ResourceExhausted { pool: String },

    #[error("Admin password for {node} unavailable after {waited_seconds} seconds")]
    PasswordUnavailable { node: String, waited_seconds: u64 },

    #[error("No connection to machine: {host}")]
    Unreachable { host: String },

    #[error("Remote {action} on {host} failed: {output}")]
    RemoteCommandFailed {
        host: String,
        action: String,
        output: String,
    },

    #[error("Malformed cluster: {reason}")]
    MalformedCluster { reason: String },

    #[error("Failed to deploy {playbook}: {output}")]
    ProvisionerFailed { playbook: String, output: String },

    #[error("Cloud operation '{operation}' failed: {output}")]
    CloudCommandFailed { operation: String, output: String },

    #[error("Failed to clone {repo}: {output}")]
    CheckoutFailed { repo: String, output: String },

    #[error("Build of {target} failed: {output}")]
    BuildFailed { target: String, output: String },

    #[error("Build artifact missing: {path}")]
    ArtifactMissing { path: String },

    #[error("Kubeconfig {path} is invalid: {reason}")]
    KubeconfigInvalid { path: String, reason: String },

    #[error("Template '{name}' failed to render: {reason}")]
    Template { name: String, reason: String },

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Node {node} has no floating IP")]
    MissingFloatingIp { node: String },

    #[error("Windows node {node} has no admin password")]
    MissingCredentials { node: String },
}

impl ClusterError {
    /// True for programming-invariant violations, as opposed to workflow failures.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::MissingFloatingIp { .. }
                | Self::MissingCredentials { .. }
        )
    }
}

impl UserFriendlyError for ClusterError {
    fn user_message(&self) -> String {
        match self {
            Self::ResourceExhausted { pool } => {
                format!("The floating IP pool '{pool}' has no free addresses")
            }
            Self::PasswordUnavailable {
                node,
                waited_seconds,
            } => format!(
                "Windows node {node} did not expose its admin password within {waited_seconds}s"
            ),
            Self::Unreachable { host } => format!("Host {host} never became reachable"),
            Self::RemoteCommandFailed { host, action, .. } => {
                format!("Remote {action} on {host} exited with an error")
            }
            Self::MalformedCluster { reason } => format!("Cluster is malformed: {reason}"),
            Self::ProvisionerFailed { playbook, .. } => {
                format!("ansible-playbook {playbook} failed")
            }
            Self::CloudCommandFailed { operation, .. } => {
                format!("OpenStack operation '{operation}' failed")
            }
            Self::CheckoutFailed { repo, .. } => format!("git clone of {repo} failed"),
            Self::BuildFailed { target, .. } => format!("Building {target} failed"),
            Self::ArtifactMissing { path } => format!("Expected build output {path} is missing"),
            Self::KubeconfigInvalid { path, reason } => {
                format!("Kubeconfig fetched to {path} could not be rewritten: {reason}")
            }
            Self::Template { name, reason } => {
                format!("Could not render {name}: {reason}")
            }
            Self::InvalidTransition { from, to } => {
                format!("Internal error: lifecycle cannot move from {from} to {to}")
            }
            Self::MissingFloatingIp { node } => {
                format!("Internal error: node {node} reached inventory without a floating IP")
            }
            Self::MissingCredentials { node } => {
                format!("Internal error: Windows node {node} reached inventory without a password")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::RemoteCommandFailed { output, .. }
            | Self::ProvisionerFailed { output, .. }
            | Self::CloudCommandFailed { output, .. }
            | Self::CheckoutFailed { output, .. }
            | Self::BuildFailed { output, .. } => {
                if output.is_empty() {
                    None
                } else {
                    Some(format!("Captured output:\n{output}"))
                }
            }
            Self::PasswordUnavailable { .. } => Some(
                "Windows instances publish an encrypted admin password through the metadata service once cloudbase-init finishes."
                    .to_string(),
            ),
            Self::MalformedCluster { .. } => Some(
                "The first Linux VM becomes the Kubernetes master; at least one is required."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let mut suggestions = match self {
            Self::ResourceExhausted { .. } => vec![
                "Release unused floating IPs or request a larger quota".to_string(),
            ],
            Self::PasswordUnavailable { .. } => vec![
                "Check the Windows VM console log for cloudbase-init errors".to_string(),
                "Raise [timeouts].password_timeout_secs".to_string(),
            ],
            Self::Unreachable { .. } => vec![
                "Verify the floating IP is routable and the security group allows SSH/WinRM"
                    .to_string(),
            ],
            Self::MalformedCluster { .. } => vec!["Pass at least one --linux-vm".to_string()],
            Self::ProvisionerFailed { .. } => vec![
                "Read ansible-deploy.log in the log directory".to_string(),
            ],
            Self::CheckoutFailed { .. } => vec![
                "Check the repository URL and that the branch exists".to_string(),
            ],
            Self::ArtifactMissing { .. } => vec!["Run 'ovnci build' before 'ovnci up'".to_string()],
            _ => Vec::new(),
        };
        if !self.is_invariant_violation() && !matches!(self, Self::MalformedCluster { .. }) {
            suggestions.push("Run 'ovnci down' to remove VMs left behind by this run".to_string());
        }
        suggestions
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ResourceExhausted { .. }
            | Self::PasswordUnavailable { .. }
            | Self::CloudCommandFailed { .. } => ErrorCategory::Cloud,
            Self::Unreachable { .. } => ErrorCategory::Connectivity,
            Self::RemoteCommandFailed { .. } => ErrorCategory::RemoteExecution,
            Self::MalformedCluster { .. } => ErrorCategory::Configuration,
            Self::ProvisionerFailed { .. }
            | Self::Template { .. }
            | Self::CheckoutFailed { .. }
            | Self::BuildFailed { .. } => ErrorCategory::Provisioning,
            Self::ArtifactMissing { .. } | Self::KubeconfigInvalid { .. } => {
                ErrorCategory::FileSystem
            }
            Self::InvalidTransition { .. }
            | Self::MissingFloatingIp { .. }
            | Self::MissingCredentials { .. } => ErrorCategory::Invariant,
        }
    }
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        match self {
            Self::SpawnFailed { program, reason } => {
                format!("Could not start '{program}': {reason}")
            }
            Self::ExecutionFailed { reason } => format!("Process supervision failed: {reason}"),
            Self::Timeout {
                program,
                timeout_seconds,
            } => format!("'{program}' did not finish within {timeout_seconds} seconds"),
        }
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::SpawnFailed { .. } => {
                vec!["Run 'ovnci doctor' to check required tools are on PATH".to_string()]
            }
            Self::Timeout { .. } => vec!["Raise the matching value in [timeouts]".to_string()],
            Self::ExecutionFailed { .. } => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Process
    }
}

impl UserFriendlyError for OvnCiError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Cluster(err) => err.user_message(),
            Self::Runner(err) => err.user_message(),
            Self::Filesystem { path, reason } => {
                format!("File operation on {path} failed: {reason}")
            }
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Cluster(err) => err.context(),
            Self::Runner(err) => err.context(),
            Self::Filesystem { .. } | Self::Io(_) => Some(
                "Writing /etc/hosts and the provisioner checkout usually requires root."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Cluster(err) => err.suggestions(),
            Self::Runner(err) => err.suggestions(),
            Self::Filesystem { .. } | Self::Io(_) => vec![
                "Check file permissions and free disk space".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Cluster(err) => err.category(),
            Self::Runner(_) => ErrorCategory::Process,
            Self::Filesystem { .. } | Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl OvnCiError {
    /// Shorthand for a [`OvnCiError::Filesystem`] error.
    pub fn filesystem(path: impl AsRef<std::path::Path>, reason: impl fmt::Display) -> Self {
        Self::Filesystem {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Format the error, its context and suggestions for terminal output.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Cluster(err) => match err {
                ClusterError::ResourceExhausted { .. } => ExitCode::RESOURCE_EXHAUSTED,
                ClusterError::PasswordUnavailable { .. } => ExitCode::PASSWORD_UNAVAILABLE,
                ClusterError::Unreachable { .. } => ExitCode::UNREACHABLE,
                ClusterError::RemoteCommandFailed { .. } => ExitCode::REMOTE_COMMAND_FAILED,
                ClusterError::ProvisionerFailed { .. } => ExitCode::PROVISIONER_FAILED,
                ClusterError::MalformedCluster { .. } => ExitCode::MALFORMED_CLUSTER,
                ClusterError::CloudCommandFailed { .. } => ExitCode::CLOUD_FAILURE,
                ClusterError::CheckoutFailed { .. } | ClusterError::BuildFailed { .. } => {
                    ExitCode::BUILD_FAILED
                }
                _ => ExitCode::INTERNAL,
            },
            Self::Runner(RunnerError::Timeout { .. }) => ExitCode::TIMEOUT,
            _ => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_cluster_error_passes_through_unchanged() {
        let err: OvnCiError = ClusterError::Unreachable {
            host: "winnode1".to_string(),
        }
        .into();

        assert!(matches!(
            err,
            OvnCiError::Cluster(ClusterError::Unreachable { ref host }) if host == "winnode1"
        ));
        assert_eq!(err.to_string(), "No connection to machine: winnode1");
        assert_eq!(err.to_exit_code(), ExitCode::UNREACHABLE);
    }

    #[test]
    fn test_invariant_violations_are_classified() {
        let err = ClusterError::InvalidTransition {
            from: "Empty".to_string(),
            to: "Deployed".to_string(),
        };
        assert!(err.is_invariant_violation());
        assert_eq!(err.category(), ErrorCategory::Invariant);

        let workflow = ClusterError::MalformedCluster {
            reason: "no Linux nodes".to_string(),
        };
        assert!(!workflow.is_invariant_violation());
        assert_eq!(
            OvnCiError::from(workflow).to_exit_code(),
            ExitCode::MALFORMED_CLUSTER
        );
    }

    #[test]
    fn test_display_for_user_includes_captured_output() {
        let err = OvnCiError::from(ClusterError::ProvisionerFailed {
            playbook: "ovn-kubernetes-cluster.yml".to_string(),
            output: "fatal: [master]: UNREACHABLE!".to_string(),
        });
        let message = err.display_for_user();

        assert!(message.starts_with("Error: ansible-playbook ovn-kubernetes-cluster.yml failed"));
        assert!(message.contains("fatal: [master]: UNREACHABLE!"));
        assert!(message.contains("ovnci down"));
    }

    #[test]
    fn test_runner_timeout_maps_to_timeout_exit() {
        let err = OvnCiError::from(RunnerError::Timeout {
            program: "ansible-playbook".to_string(),
            timeout_seconds: 7200,
        });
        assert_eq!(err.to_exit_code(), ExitCode::TIMEOUT);
        assert_eq!(err.category(), ErrorCategory::Process);
    }

    #[test]
    fn test_config_errors_map_to_cli_args() {
        let err = OvnCiError::from(ConfigError::MissingRequired("openstack.key_file".to_string()));
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert!(err.display_for_user().contains("openstack.key_file"));
    }
}
