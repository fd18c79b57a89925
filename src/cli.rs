//! Command-line interface definition.
//!
//! Lives in the library so `cargo xtask man` can render it.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::OnError;

/// Version string, with the git commit for development builds.
#[cfg(not(feature = "release"))]
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");

#[cfg(feature = "release")]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "nanoskim", version = VERSION)]
#[command(about = "Skim columnar event files with cumulative cuts and a cutflow report")]
#[command(long_about = None)]
pub struct Cli {
    /// Skim configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the chosen verbosity. `RUST_LOG` wins over it.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Skim one source into one output file
    Skim(SkimArgs),

    /// Skim every file of a dataset
    Batch(BatchArgs),

    /// Print the cutflow of a source without writing anything
    Cutflow {
        /// Local path or endpoint URL of the source
        #[arg(short, long, value_name = "LOCATION")]
        input: String,

        /// Selection document (JSON object of cut name to expression)
        #[arg(long, value_name = "FILE")]
        cuts: PathBuf,
    },

    /// Print the cumulative selection expressions
    Expression {
        /// Selection document (JSON object of cut name to expression)
        #[arg(long, value_name = "FILE")]
        cuts: PathBuf,

        /// Only print this stage (0 selects everything)
        #[arg(long)]
        stage: Option<usize>,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
pub struct SkimArgs {
    /// Local path or endpoint URL of the source
    #[arg(short, long, value_name = "LOCATION")]
    pub input: String,

    /// Selection document (JSON object of cut name to expression)
    #[arg(long, value_name = "FILE")]
    pub cuts: PathBuf,

    /// Field exclusion document (JSON object of regex patterns)
    #[arg(long, value_name = "FILE")]
    pub exclusions: Option<PathBuf>,

    /// Output file; replaced if it exists
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Dataset document (JSON object of dataset key to short name and files)
    #[arg(long, value_name = "FILE")]
    pub datasets: PathBuf,

    /// Dataset to process
    #[arg(long, value_name = "KEY")]
    pub dataset_key: String,

    /// Selection document (JSON object of cut name to expression)
    #[arg(long, value_name = "FILE")]
    pub cuts: PathBuf,

    /// Field exclusion document (JSON object of regex patterns)
    #[arg(long, value_name = "FILE")]
    pub exclusions: Option<PathBuf>,

    /// Directory receiving the outputs
    #[arg(long, value_name = "DIR")]
    pub destination: PathBuf,

    /// Group outputs in a directory named after the dataset and current time
    #[arg(long)]
    pub timestamped: bool,

    /// Appended to the timestamped directory name
    #[arg(long, requires = "timestamped")]
    pub suffix: Option<String>,

    /// What to do when a file fails [default: from config, else abort]
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Files skimmed at once [default: from config, else 1]
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}
