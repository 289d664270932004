//! # CLI Command Implementations
//!
//! One module per `scroll-split` subcommand. Each defines a clap `Args`
//! struct and an `execute` function that calls into the `scroll_split`
//! library.

pub mod completions;
pub mod split;
pub mod validate;
pub mod verify;
