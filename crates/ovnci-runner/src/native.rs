use crate::error::RunnerError;
use std::process::Stdio;
use std::time::Duration;

use super::{CommandSpec, ProcessOutput, ProcessRunner};

// ============================================================================
// NativeRunner - direct process execution
// ============================================================================

/// Native process runner using `std::process::Command`.
///
/// Uses `Command::new().args()` only, captures both output streams and kills
/// the child's whole process group when the timeout expires. Timeout handling
/// is thread based so the public API stays synchronous.
///
/// # Example
///
/// ```rust,no_run
/// use ovnci_runner::{CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("ansible").arg("--version");
///
/// let output = runner.run(&cmd, Duration::from_secs(30)).unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        use std::sync::mpsc;
        use std::thread;

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so ssh/ansible descendants die with the child.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program_name(),
            reason: e.to_string(),
        })?;

        let (tx, rx) = mpsc::channel();
        let child_id = child.id();

        let handle = thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        match rx.recv_timeout(timeout) {
            Ok(output_result) => {
                let _ = handle.join();

                let output = output_result.map_err(|e| RunnerError::ExecutionFailed {
                    reason: format!("Failed to wait for process: {e}"),
                })?;

                Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                ))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Self::terminate_process_group(child_id);
                // Not joined: a descendant that left the group can hold the pipes open.
                drop(handle);

                Err(RunnerError::Timeout {
                    program: cmd.program_name(),
                    timeout_seconds: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::ExecutionFailed {
                reason: "Process monitoring thread terminated unexpectedly".to_string(),
            }),
        }
    }
}

impl NativeRunner {
    /// Kill the process group led by `pid` (SIGKILL on Unix).
    fn terminate_process_group(pid: u32) {
        #[cfg(unix)]
        {
            // SAFETY: kill(2) on the group we created at spawn; a stale group only yields ESRCH.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_native_runner_captures_stdout() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("echo").arg("hello");
        let output = runner.run(&cmd, Duration::from_secs(10)).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_string().trim(), "hello");
    }

    #[test]
    fn test_native_runner_reports_non_zero_exit() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("false");
        let output = runner.run(&cmd, Duration::from_secs(10)).unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(1));
    }

    #[test]
    fn test_native_runner_missing_program() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("ovnci-definitely-not-a-binary");
        let result = runner.run(&cmd, Duration::from_secs(10));

        assert!(matches!(result, Err(RunnerError::SpawnFailed { .. })));
    }

    #[test]
    fn test_native_runner_times_out() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("sleep").arg("5");
        let result = runner.run(&cmd, Duration::from_millis(100));

        match result {
            Err(RunnerError::Timeout { program, .. }) => assert_eq!(program, "sleep"),
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_native_runner_timeout_kills_background_descendants() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("sh").arg("-c").arg("sleep 30 & sleep 30");

        let started = std::time::Instant::now();
        let result = runner.run(&cmd, Duration::from_secs(1));

        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "timeout took {:?}",
            started.elapsed()
        );
    }
}
