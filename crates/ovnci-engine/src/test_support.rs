//! Scripted fakes for driving the workflow without a cloud or ansible.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ovnci_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use ovnci_utils::error::{ClusterError, Result};

use crate::artifacts::ArtifactSource;
use crate::cloud::{CloudProvider, InstanceSpec};
use crate::node::Node;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Responder = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, RunnerError> + Send + Sync>;

/// [`ProcessRunner`] that records every command and answers from a script.
///
/// Queued responses are consumed first, in order; after that the responder
/// closure answers.
pub struct ScriptedRunner {
    responder: Responder,
    queue: Mutex<VecDeque<Result<ProcessOutput, RunnerError>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<ProcessOutput, RunnerError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command succeeds with empty output.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(|_| Ok(ProcessOutput::ok("")))
    }

    /// Answer with `responses` in order, then succeed with empty output.
    #[must_use]
    pub fn sequence(responses: Vec<Result<ProcessOutput, RunnerError>>) -> Self {
        let runner = Self::ok();
        lock(&runner.queue).extend(responses);
        runner
    }

    /// Every command recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        lock(&self.calls).clone()
    }

    /// Rendered argv of every recorded command.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.calls).iter().map(CommandSpec::display).collect()
    }

    /// Recorded commands whose program is `program`.
    #[must_use]
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        lock(&self.calls)
            .iter()
            .filter(|cmd| cmd.program_name() == program)
            .cloned()
            .collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        lock(&self.calls).push(cmd.clone());
        if let Some(response) = lock(&self.queue).pop_front() {
            return response;
        }
        (self.responder)(cmd)
    }
}

/// Bookkeeping of what a [`FakeCloud`] was asked to do.
#[derive(Debug, Default, Clone)]
pub struct FakeCloudLog {
    pub created: Vec<InstanceSpec>,
    pub deleted: Vec<String>,
    pub rebooted: Vec<String>,
    pub existing: BTreeSet<String>,
}

/// In-memory [`CloudProvider`].
#[derive(Debug, Default)]
pub struct FakeCloud {
    free_ips: Mutex<VecDeque<IpAddr>>,
    passwords: HashMap<String, String>,
    log: Mutex<FakeCloudLog>,
}

impl FakeCloud {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add addresses to the free floating IP pool.
    ///
    /// # Panics
    ///
    /// Panics if an entry is not an IP address.
    #[must_use]
    pub fn with_free_ips<'a>(self, ips: impl IntoIterator<Item = &'a str>) -> Self {
        lock(&self.free_ips).extend(ips.into_iter().map(|ip| ip.parse::<IpAddr>().unwrap()));
        self
    }

    /// Password the cloud reports for a Windows instance.
    #[must_use]
    pub fn with_password(mut self, name: &str, password: &str) -> Self {
        self.passwords.insert(name.to_string(), password.to_string());
        self
    }

    /// Pretend an instance already exists.
    #[must_use]
    pub fn with_existing(self, name: &str) -> Self {
        lock(&self.log).existing.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn log(&self) -> FakeCloudLog {
        lock(&self.log).clone()
    }
}

impl CloudProvider for FakeCloud {
    fn create_instance(&self, spec: &InstanceSpec) -> Result<Node> {
        let mut log = lock(&self.log);
        log.created.push(spec.clone());
        log.existing.insert(spec.name.clone());
        Ok(Node::new(spec.name.clone(), spec.os))
    }

    fn attach_floating_ip(&self, node: Node) -> Result<Node> {
        let ip = lock(&self.free_ips)
            .pop_front()
            .ok_or_else(|| ClusterError::ResourceExhausted {
                pool: "fake".to_string(),
            })?;
        Ok(node.with_floating_ip(ip))
    }

    fn fetch_windows_password(&self, name: &str, _private_key: &Utf8Path) -> Result<String> {
        self.passwords.get(name).cloned().ok_or_else(|| {
            ClusterError::PasswordUnavailable {
                node: name.to_string(),
                waited_seconds: 0,
            }
            .into()
        })
    }

    fn delete_instance(&self, name: &str) -> Result<()> {
        let mut log = lock(&self.log);
        log.existing.remove(name);
        log.deleted.push(name.to_string());
        Ok(())
    }

    fn reboot(&self, name: &str) -> Result<()> {
        lock(&self.log).rebooted.push(name.to_string());
        Ok(())
    }
}

/// [`ArtifactSource`] over directories that already hold the binaries.
#[derive(Debug)]
pub struct StaticArtifacts {
    linux_dir: Utf8PathBuf,
    windows_dir: Utf8PathBuf,
    steps: Mutex<Vec<&'static str>>,
}

impl StaticArtifacts {
    #[must_use]
    pub fn new(linux_dir: impl Into<Utf8PathBuf>, windows_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            linux_dir: linux_dir.into(),
            windows_dir: windows_dir.into(),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Create every expected binary as an empty file under both directories.
    pub fn populate(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.linux_dir)?;
        std::fs::create_dir_all(&self.windows_dir)?;
        for name in crate::artifacts::LINUX_BINARIES {
            std::fs::write(self.linux_dir.join(name), b"")?;
        }
        for name in crate::artifacts::WINDOWS_BINARIES {
            std::fs::write(self.windows_dir.join(name), b"")?;
        }
        Ok(())
    }

    /// Steps invoked so far (`fetch`, `build`).
    #[must_use]
    pub fn steps(&self) -> Vec<&'static str> {
        lock(&self.steps).clone()
    }
}

impl ArtifactSource for StaticArtifacts {
    fn fetch(&self) -> Result<()> {
        lock(&self.steps).push("fetch");
        Ok(())
    }

    fn build(&self) -> Result<()> {
        lock(&self.steps).push("build");
        Ok(())
    }

    fn linux_bin_dir(&self) -> Utf8PathBuf {
        self.linux_dir.clone()
    }

    fn windows_bin_dir(&self) -> Utf8PathBuf {
        self.windows_dir.clone()
    }
}
