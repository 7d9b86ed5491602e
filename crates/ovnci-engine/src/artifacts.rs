//! Workload binaries: fetching, building and staging them for the playbook.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tracing::info;

use ovnci_runner::{CommandSpec, ProcessRunner};
use ovnci_utils::error::{ClusterError, OvnCiError, Result};

use crate::git::clone_repo;

/// Linux binaries the playbook expects in `<playbook_root>/tmp`.
pub const LINUX_BINARIES: [&str; 6] = [
    "kubelet",
    "kubectl",
    "kube-apiserver",
    "kube-controller-manager",
    "kube-scheduler",
    "kube-proxy",
];

/// Windows binaries the playbook expects in `<playbook_root>/tmp`.
pub const WINDOWS_BINARIES: [&str; 3] = ["kubelet.exe", "kubectl.exe", "kube-proxy.exe"];

/// Source of the prebuilt cluster binaries.
pub trait ArtifactSource {
    /// Obtain the sources.
    fn fetch(&self) -> Result<()>;

    /// Produce the Linux and Windows binaries.
    fn build(&self) -> Result<()>;

    fn linux_bin_dir(&self) -> Utf8PathBuf;

    fn windows_bin_dir(&self) -> Utf8PathBuf;
}

/// Kubernetes built from a git checkout with `make`.
#[derive(Debug, Clone)]
pub struct KubernetesSource<R> {
    runner: R,
    repo: String,
    branch: String,
    checkout: Utf8PathBuf,
    linux_bin_dir: Utf8PathBuf,
    windows_bin_dir: Utf8PathBuf,
    timeout: Duration,
}

impl<R: ProcessRunner> KubernetesSource<R> {
    /// `linux_bin_dir` and `windows_bin_dir` are relative to `checkout`.
    pub fn new(
        runner: R,
        repo: impl Into<String>,
        branch: impl Into<String>,
        checkout: impl Into<Utf8PathBuf>,
        linux_bin_dir: &Utf8Path,
        windows_bin_dir: &Utf8Path,
        timeout: Duration,
    ) -> Self {
        let checkout = checkout.into();
        Self {
            runner,
            repo: repo.into(),
            branch: branch.into(),
            linux_bin_dir: checkout.join(linux_bin_dir),
            windows_bin_dir: checkout.join(windows_bin_dir),
            checkout,
            timeout,
        }
    }

    fn make(&self, platform: &str, binaries: &[&str]) -> Result<()> {
        let what = binaries
            .iter()
            .map(|bin| format!("cmd/{}", bin.trim_end_matches(".exe")))
            .collect::<Vec<_>>()
            .join(" ");

        info!(platform = %platform, what = %what, "Building Kubernetes binaries");
        let cmd = CommandSpec::new("make")
            .arg(format!("WHAT={what}"))
            .cwd(self.checkout.as_std_path())
            .env("KUBE_BUILD_PLATFORMS", platform);

        let output = self.runner.run(&cmd, self.timeout)?;
        if !output.success() {
            return Err(ClusterError::BuildFailed {
                target: platform.to_string(),
                output: output.combined_output(),
            }
            .into());
        }
        Ok(())
    }
}

impl<R: ProcessRunner> ArtifactSource for KubernetesSource<R> {
    fn fetch(&self) -> Result<()> {
        clone_repo(&self.runner, &self.repo, &self.branch, &self.checkout, self.timeout)
    }

    fn build(&self) -> Result<()> {
        self.make("linux/amd64", &LINUX_BINARIES)?;
        self.make("windows/amd64", &WINDOWS_BINARIES)
    }

    fn linux_bin_dir(&self) -> Utf8PathBuf {
        self.linux_bin_dir.clone()
    }

    fn windows_bin_dir(&self) -> Utf8PathBuf {
        self.windows_bin_dir.clone()
    }
}

/// Copy every expected binary into `dest`, creating it if needed.
///
/// Returns the staged paths. A missing binary fails with `ArtifactMissing`
/// before anything is copied.
pub fn stage_binaries<A: ArtifactSource + ?Sized>(
    source: &A,
    dest: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>> {
    let linux_dir = source.linux_bin_dir();
    let windows_dir = source.windows_bin_dir();

    let sources: Vec<Utf8PathBuf> = LINUX_BINARIES
        .iter()
        .map(|bin| linux_dir.join(bin))
        .chain(WINDOWS_BINARIES.iter().map(|bin| windows_dir.join(bin)))
        .collect();

    if let Some(missing) = sources.iter().find(|path| !path.is_file()) {
        return Err(ClusterError::ArtifactMissing {
            path: missing.to_string(),
        }
        .into());
    }

    std::fs::create_dir_all(dest).map_err(|e| OvnCiError::filesystem(dest, e))?;

    let mut staged = Vec::with_capacity(sources.len());
    for src in sources {
        // Both lists hold plain file names.
        let Some(file_name) = src.file_name() else {
            continue;
        };
        let target = dest.join(file_name);
        info!(src = %src, dest = %target, "Staging binary");
        std::fs::copy(&src, &target).map_err(|e| OvnCiError::filesystem(&src, e))?;
        staged.push(target);
    }

    Ok(staged)
}
