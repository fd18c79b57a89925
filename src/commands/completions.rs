//! Shell completion generation

use std::io;

use clap::CommandFactory;
use clap_complete::Shell;

use nanoskim::cli::Cli;

#[cfg(not(tarpaulin_include))]
pub fn handle(shell: Shell) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut io::stdout());
}
