pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;

pub use error::{
    ClusterError, ConfigError, ErrorCategory, OvnCiError, Result, UserFriendlyError,
};
pub use exit_codes::ExitCode;
