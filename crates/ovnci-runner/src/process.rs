use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - process execution seam
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self::new(stdout.into(), Vec::new(), Some(0))
    }

    /// Failed output with the given exit code and stderr.
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self::new(Vec::new(), stderr.into(), Some(exit_code))
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout followed by stderr, used when a failure's output is reported.
    ///
    /// Ansible writes its diagnostics to stdout, the cloud clients to stderr,
    /// so both streams are kept.
    #[must_use]
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout_string();
        let stderr = self.stderr_string();
        match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
            (false, true) => stdout.trim_end().to_string(),
            (true, false) => stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation).
/// The interface is synchronous: the workflow is a single blocking sequence and
/// each call runs to completion (or timeout) before the next step starts.
///
/// # Returns
///
/// * `Ok(ProcessOutput)` - The process completed (possibly with non-zero exit code)
/// * `Err(RunnerError::Timeout)` - The process exceeded `timeout` and was killed
/// * `Err(RunnerError::*)` - The process could not be spawned or supervised
pub trait ProcessRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for std::sync::Arc<R> {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_output_success() {
        assert!(ProcessOutput::ok("done").success());
        assert!(!ProcessOutput::failed(2, "unreachable").success());
        // Killed by signal
        assert!(!ProcessOutput::new(Vec::new(), Vec::new(), None).success());
    }

    #[test]
    fn test_combined_output_keeps_both_streams() {
        let output = ProcessOutput::new(b"PLAY RECAP\n".to_vec(), b"fatal: boom\n".to_vec(), Some(2));
        assert_eq!(output.combined_output(), "PLAY RECAP\nfatal: boom");

        let stdout_only = ProcessOutput::ok("only stdout\n");
        assert_eq!(stdout_only.combined_output(), "only stdout");

        let empty = ProcessOutput::failed(1, "");
        assert_eq!(empty.combined_output(), "");
    }

    #[test]
    fn test_process_output_lossy_utf8() {
        let invalid_utf8 = vec![0xff, 0xfe, 0x00, 0x01];
        let output = ProcessOutput::new(invalid_utf8.clone(), invalid_utf8, Some(0));
        assert!(!output.stdout_string().is_empty());
        assert!(!output.stderr_string().is_empty());
    }

    struct TimeoutRunner;

    impl ProcessRunner for TimeoutRunner {
        fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
            Err(RunnerError::Timeout {
                program: cmd.program_name(),
                timeout_seconds: timeout.as_secs(),
            })
        }
    }

    #[test]
    fn test_runner_by_reference_delegates() {
        let runner = TimeoutRunner;
        let by_ref: &dyn ProcessRunner = &runner;
        let result = by_ref.run(&CommandSpec::new("ansible"), Duration::from_secs(60));

        match result {
            Err(RunnerError::Timeout {
                program,
                timeout_seconds,
            }) => {
                assert_eq!(program, "ansible");
                assert_eq!(timeout_seconds, 60);
            }
            other => panic!("Expected Timeout error, got {other:?}"),
        }
    }
}
