//! Process execution for the ovnci workflow
//!
//! Every external tool the workflow drives (`openstack`, `nova`, `ansible`,
//! `ansible-playbook`, `git`, `make`) is spawned through this crate.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements, never as shell strings, so values such
//! as module arguments or passwords are not re-interpreted by a shell.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
