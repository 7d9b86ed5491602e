use camino::Utf8Path;
use std::time::Duration;
use tracing::info;

use ovnci_runner::{CommandSpec, ProcessRunner};
use ovnci_utils::error::{ClusterError, OvnCiError, Result};

/// Fresh single-branch clone of `repo` at `branch` into `dest`.
///
/// An existing checkout at `dest` is removed first.
pub fn clone_repo<R: ProcessRunner>(
    runner: &R,
    repo: &str,
    branch: &str,
    dest: &Utf8Path,
    timeout: Duration,
) -> Result<()> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| OvnCiError::filesystem(dest, e))?;
    }

    info!(repo = %repo, branch = %branch, dest = %dest, "Cloning repository");
    let cmd = CommandSpec::new("git")
        .args(["clone", "--branch", branch, "--single-branch", repo])
        .arg(dest.as_str());

    let output = runner.run(&cmd, timeout)?;
    if !output.success() {
        return Err(ClusterError::CheckoutFailed {
            repo: repo.to_string(),
            output: output.combined_output(),
        }
        .into());
    }
    Ok(())
}
