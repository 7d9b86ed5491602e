//! Command-line interface for ovnci
//!
//! - `args`: clap argument definitions
//! - `run`: entry point and dispatch
//! - `commands`: command implementations

pub mod args;
pub mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;
