//! Exit code constants for ovnci.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure, invariant violations |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `RESOURCE_EXHAUSTED` | Floating IP pool empty |
//! | 4 | `PASSWORD_UNAVAILABLE` | Windows admin password never appeared |
//! | 5 | `UNREACHABLE` | Host did not answer the connectivity probe |
//! | 6 | `REMOTE_COMMAND_FAILED` | Remote copy/fetch/exec failed |
//! | 7 | `PROVISIONER_FAILED` | Cluster playbook failed |
//! | 8 | `MALFORMED_CLUSTER` | No Linux master requested |
//! | 9 | `BUILD_FAILED` | git clone or workload build failed |
//! | 10 | `TIMEOUT` | A subprocess exceeded its timeout |
//! | 70 | `CLOUD_FAILURE` | OpenStack/nova client failed |

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use ovnci_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::UNREACHABLE, ExitCode::from_i32(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure or violated invariant
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid or missing command-line arguments
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// No free floating IP
    pub const RESOURCE_EXHAUSTED: ExitCode = ExitCode(3);

    /// Windows admin password not published in time
    pub const PASSWORD_UNAVAILABLE: ExitCode = ExitCode(4);

    /// Host unreachable
    pub const UNREACHABLE: ExitCode = ExitCode(5);

    /// Remote command failed
    pub const REMOTE_COMMAND_FAILED: ExitCode = ExitCode(6);

    /// Provisioner playbook failed
    pub const PROVISIONER_FAILED: ExitCode = ExitCode(7);

    /// Cluster definition has no Linux node
    pub const MALFORMED_CLUSTER: ExitCode = ExitCode(8);

    /// Repository clone or build failed
    pub const BUILD_FAILED: ExitCode = ExitCode(9);

    /// Subprocess timeout
    pub const TIMEOUT: ExitCode = ExitCode(10);

    /// Cloud client failure
    pub const CLOUD_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let all = [
            ExitCode::SUCCESS,
            ExitCode::INTERNAL,
            ExitCode::CLI_ARGS,
            ExitCode::RESOURCE_EXHAUSTED,
            ExitCode::PASSWORD_UNAVAILABLE,
            ExitCode::UNREACHABLE,
            ExitCode::REMOTE_COMMAND_FAILED,
            ExitCode::PROVISIONER_FAILED,
            ExitCode::MALFORMED_CLUSTER,
            ExitCode::BUILD_FAILED,
            ExitCode::TIMEOUT,
            ExitCode::CLOUD_FAILURE,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_i32_conversions() {
        assert_eq!(i32::from(ExitCode::CLOUD_FAILURE), 70);
        assert_eq!(ExitCode::from(7), ExitCode::PROVISIONER_FAILED);
    }
}
