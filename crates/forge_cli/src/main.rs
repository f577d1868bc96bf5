//! kubeforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Plugin or cluster file load error
//! - 4: Template or composition error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forge_api::ApiError;
use forge_extension::CompositionError;
use forge_templates::TemplateError;

mod commands;

use commands::{Cli, Commands, InvalidArgument};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const LOAD_ERROR: u8 = 3;
    pub const COMPOSITION_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args),
        Commands::Plugins(args) => commands::plugins::execute(args),
        Commands::Version => commands::version::execute(),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Log to stderr so stdout stays machine readable.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "forge=debug,warn"
    } else {
        "forge=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logging may already be initialized; keep going either way.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.is::<InvalidArgument>() {
            return ExitCodes::INVALID_ARGS;
        }
        if cause.is::<CompositionError>() || cause.is::<TemplateError>() {
            return ExitCodes::COMPOSITION_ERROR;
        }
        if cause.is::<ApiError>() {
            return ExitCodes::LOAD_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
