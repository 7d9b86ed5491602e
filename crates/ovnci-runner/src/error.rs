//! Error types for runner module

use thiserror::Error;

/// Failures to start or supervise a child process.
///
/// A process that runs to completion with a non-zero exit code is NOT a
/// `RunnerError`; callers inspect [`ProcessOutput`](crate::ProcessOutput) for that.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Process execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("'{program}' timed out after {timeout_seconds} seconds")]
    Timeout {
        program: String,
        timeout_seconds: u64,
    },
}
