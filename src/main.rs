use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nanoskim::cli::{Cli, Commands, ConfigAction};
use nanoskim::error::exit;
use nanoskim::{ConfigError, SkimError};

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_filter());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Logs go to stderr so stdout only carries results.
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Skim(args) => commands::skim::handle(config, args),
        Commands::Batch(args) => commands::batch::handle(config, args),
        Commands::Cutflow { input, cuts } => {
            commands::inspect::handle_cutflow(config, &input, &cuts)
        }
        Commands::Expression { cuts, stage } => commands::inspect::handle_expression(&cuts, stage),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::handle_show(config),
        },
        Commands::Completions { shell } => {
            commands::completions::handle(shell);
            Ok(())
        }
    }
}

/// Exit status of the first classified error in the chain.
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(skim) = cause.downcast_ref::<SkimError>() {
            return skim.exit_code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit::CONFIG;
        }
    }
    exit::FAILURE
}
