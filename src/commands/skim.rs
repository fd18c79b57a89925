//! Single-file skim handler

use std::path::Path;

use anyhow::{Context, Result};

use nanoskim::cli::SkimArgs;
use nanoskim::{SkimConfig, SkimPipeline};

/// Skim one source and print its cutflow.
#[cfg(not(tarpaulin_include))]
pub fn handle(config_path: Option<&Path>, args: SkimArgs) -> Result<()> {
    let config = SkimConfig::load_or_default(config_path)?;
    let pipeline = SkimPipeline::from_paths(config, &args.cuts, args.exclusions.as_deref())?;

    let outcome = pipeline
        .run(&args.input, &args.output)
        .with_context(|| format!("Failed to skim {}", args.input))?;

    println!("{}", outcome.cutflow);
    println!();
    if !outcome.excluded.is_empty() {
        println!("Excluded {} field(s)", outcome.excluded.len());
    }
    println!("{}", super::describe(&outcome));
    Ok(())
}
