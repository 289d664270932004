//! # Verify Command Implementation
//!
//! Builds one output tree in a throwaway sandbox, the same way `split
//! --verify-builds` does, and prints the tail of the build log on failure.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;

use scroll_split::output::{emoji, spinner, OutputConfig};
use scroll_split::phases::verify::{verify, VerifyOptions, DEFAULT_TIMEOUT};
use scroll_split::report::LOG_EXCERPT_LINES;

/// Configure and compile one tree in a sandbox
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Tree to build
    #[arg(value_name = "TREE")]
    pub tree: PathBuf,

    /// Time limit for the whole build, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub build_timeout: u64,

    /// Configure command, split on whitespace
    #[arg(long, value_name = "CMD", default_value = "meson setup build")]
    pub configure: String,

    /// Compile command, split on whitespace
    #[arg(long, value_name = "CMD", default_value = "ninja -C build")]
    pub compile: String,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

fn argv(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Execute the `verify` command.
pub fn execute(args: VerifyArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    if !args.tree.is_dir() {
        return Err(anyhow!("Tree not found: {}", args.tree.display()));
    }

    let options = VerifyOptions {
        timeout: Duration::from_secs(args.build_timeout),
        configure: argv(&args.configure),
        compile: argv(&args.compile),
    };

    let bar = spinner(&out, args.quiet, &format!("Building {}", args.tree.display()));
    let result = verify(&args.tree, &options);
    bar.finish_and_clear();

    if result.success {
        if !args.quiet {
            println!(
                "{} Build of {} passed in {:.1}s",
                emoji(&out, "✅", "[PASS]"),
                args.tree.display(),
                result.duration.as_secs_f64()
            );
        }
        return Ok(());
    }

    eprintln!(
        "{} Build of {} failed{}",
        emoji(&out, "❌", "[FAIL]"),
        args.tree.display(),
        if result.timed_out { " (timed out)" } else { "" }
    );
    eprintln!("{}", result.log_tail(LOG_EXCERPT_LINES));
    Err(anyhow!("Build verification failed for {}", args.tree.display()))
}
