//! Cloud provider seam: VM lifecycle, floating IPs and Windows passwords.

mod openstack;

pub use openstack::OpenStackCli;

use camino::{Utf8Path, Utf8PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use ovnci_utils::error::{ClusterError, Result};

use crate::node::{Node, OsFamily};

/// Parameters for creating one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: String,
    pub flavor: String,
    pub image_id: String,
    pub network: String,
    pub key_name: String,
    pub user_data: Option<Utf8PathBuf>,
    pub os: OsFamily,
}

/// Operations the cluster workflow needs from a cloud.
///
/// Every call blocks until the cloud reports completion.
pub trait CloudProvider {
    /// Create a VM and wait for it to become active.
    fn create_instance(&self, spec: &InstanceSpec) -> Result<Node>;

    /// Bind the first free floating IP to `node`.
    ///
    /// Fails with [`ClusterError::ResourceExhausted`] when the pool is empty.
    fn attach_floating_ip(&self, node: Node) -> Result<Node>;

    /// Block until the Windows admin password can be decrypted with
    /// `private_key`, or fail with [`ClusterError::PasswordUnavailable`].
    fn fetch_windows_password(&self, name: &str, private_key: &Utf8Path) -> Result<String>;

    /// Delete a VM. Deleting a VM that does not exist succeeds.
    fn delete_instance(&self, name: &str) -> Result<()>;

    fn reboot(&self, name: &str) -> Result<()>;
}

/// Fixed-interval polling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Call `attempt` until it yields a non-empty password or the window closes.
///
/// `attempt` runs at least once, even with a zero timeout.
pub fn poll_password<F>(node: &str, policy: PollPolicy, mut attempt: F) -> Result<String>
where
    F: FnMut() -> Result<Option<String>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(password) = attempt()?.filter(|p| !p.trim().is_empty()) {
            debug!(node = %node, attempts, "Admin password available");
            return Ok(password);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ClusterError::PasswordUnavailable {
                node: node.to_string(),
                waited_seconds: start.elapsed().as_secs(),
            }
            .into());
        }

        std::thread::sleep(policy.interval.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovnci_utils::error::OvnCiError;

    #[test]
    fn test_poll_returns_first_non_empty() {
        let mut answers = vec![None, Some(String::new()), Some("  ".to_string()), Some("pw".to_string())]
            .into_iter();
        let policy = PollPolicy::new(Duration::ZERO, Duration::from_secs(5));

        let password = poll_password("win", policy, || Ok(answers.next().flatten())).unwrap();

        assert_eq!(password, "pw");
        assert_eq!(answers.len(), 0);
    }

    #[test]
    fn test_poll_exhaustion_is_password_unavailable() {
        let mut calls = 0;
        let policy = PollPolicy::new(Duration::from_millis(5), Duration::from_millis(30));

        let result = poll_password("win", policy, || {
            calls += 1;
            Ok(None)
        });

        assert!(matches!(
            result,
            Err(OvnCiError::Cluster(ClusterError::PasswordUnavailable { ref node, .. })) if node == "win"
        ));
        assert!(calls >= 2);
    }

    #[test]
    fn test_poll_zero_timeout_attempts_once() {
        let mut calls = 0;
        let result = poll_password("win", PollPolicy::new(Duration::ZERO, Duration::ZERO), || {
            calls += 1;
            Ok(None)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_poll_propagates_attempt_errors() {
        let result = poll_password("win", PollPolicy::new(Duration::ZERO, Duration::from_secs(1)), || {
            Err(ClusterError::CloudCommandFailed {
                operation: "get-password".to_string(),
                output: "auth".to_string(),
            }
            .into())
        });
        assert!(matches!(
            result,
            Err(OvnCiError::Cluster(ClusterError::CloudCommandFailed { .. }))
        ));
    }
}
