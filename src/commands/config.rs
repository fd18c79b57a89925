//! Config subcommands handler

use std::path::Path;

use anyhow::Result;

use nanoskim::SkimConfig;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(config_path: Option<&Path>) -> Result<()> {
    let config = SkimConfig::load_or_default(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
