//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::Cli;

/// Write a completion script for the given shell to stdout.
pub(crate) fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
