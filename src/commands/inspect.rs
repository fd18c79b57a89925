//! Read-only handlers: cutflow audit and expression listing

use std::path::Path;

use anyhow::{Context, Result};

use nanoskim::{FieldExclusionSet, SelectionSet, SkimConfig, SkimPipeline};

/// Print the cutflow of a source.
#[cfg(not(tarpaulin_include))]
pub fn handle_cutflow(config_path: Option<&Path>, input: &str, cuts: &Path) -> Result<()> {
    let config = SkimConfig::load_or_default(config_path)?;
    let selection = SelectionSet::load(cuts)?;
    let pipeline = SkimPipeline::new(config, selection, FieldExclusionSet::default());

    let report = pipeline
        .cutflow(input)
        .with_context(|| format!("Failed to compute cutflow of {}", input))?;
    println!("{}", report);
    Ok(())
}

/// Print the cumulative expression of every stage, or of one.
#[cfg(not(tarpaulin_include))]
pub fn handle_expression(cuts: &Path, stage: Option<usize>) -> Result<()> {
    let selection = SelectionSet::load(cuts)?;

    if let Some(stage) = stage {
        println!("{}", selection.expression(stage));
        return Ok(());
    }

    let width = selection.names().map(str::len).max().unwrap_or(0);
    for (name, cumulative) in selection.stages() {
        println!(
            "{:>3}  {:<width$}  {}",
            cumulative.stage,
            name,
            cumulative.expression,
            width = width
        );
    }
    Ok(())
}
