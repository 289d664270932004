//! # scroll-split CLI
//!
//! Binary entry point for the `scroll-split` command-line tool. It parses
//! arguments with `clap`, sets up logging, and hands off to the command
//! implementations, which are thin wrappers over the `scroll_split` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
