//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, initialises tracing, discovers the configuration
//! and dispatches to a command. It owns all error output.

use clap::Parser;

use ovnci_config::Config;
use ovnci_utils::logging::init_tracing;
use ovnci_utils::{ExitCode, OvnCiError};

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; main.rs only maps it to
/// the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let config = Config::discover(&cli.to_cli_args()).map_err(report)?;

    let result = match cli.command {
        Commands::Up => commands::execute_up_command(&config),
        Commands::Build => commands::execute_build_command(&config),
        Commands::Down => commands::execute_down_command(&config),
        Commands::Doctor { json } => match commands::execute_doctor_command(&config, json) {
            Ok(true) => Ok(()),
            Ok(false) => return Err(ExitCode::INTERNAL),
            Err(e) => Err(e),
        },
    };

    result.map_err(report)
}

fn report(error: OvnCiError) -> ExitCode {
    eprintln!("{}", error.display_for_user());
    error.to_exit_code()
}
