//! # Completions Command Implementation
//!
//! Prints a shell completion script for `scroll-split`, generated with
//! `clap_complete`.
//!
//! ```bash
//! scroll-split completions bash > ~/.local/share/bash-completion/completions/scroll-split
//! scroll-split completions zsh > ~/.zfunc/_scroll-split
//! ```

use std::io;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command, writing the script to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
