//! Terminal output for the `scroll-split` commands
//!
//! Color and emoji use follows the `--color` flag and the usual environment
//! conventions:
//! - `--color=never|always|auto`
//! - `NO_COLOR` set to anything disables colors
//! - `CLICOLOR=0` disables colors, `CLICOLOR_FORCE=1` forces them
//! - `TERM=dumb` disables colors
//!
//! ```rust,ignore
//! use scroll_split::output::{emoji, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{} Extracting...", emoji(&out, "📦", "[EXTRACT]"));
//! ```

use std::env;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::report::RunReport;

/// Whether colors and emojis go to the terminal
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag value (`always`, `never` or `auto`).
    ///
    /// `always` wins over `NO_COLOR`; `auto` consults the environment and
    /// whether stdout is a color-capable terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when colors are on, `plain` otherwise
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Spinner for a long-running command.
///
/// Hidden when `quiet` is set or colors are off, so piped output stays
/// clean.
pub fn spinner(config: &OutputConfig, quiet: bool, message: &str) -> ProgressBar {
    if quiet || !config.use_color {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        bar.set_style(template);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// One-line verdict for a finished run
pub fn verdict(config: &OutputConfig, report: &RunReport) -> String {
    let (mark, text) = if report.overall_success {
        (emoji(config, "✅", "[OK]"), "Split succeeded".to_string())
    } else if report.state.is_done() {
        (
            emoji(config, "⚠️", "[WARN]"),
            "Split completed but a build failed".to_string(),
        )
    } else {
        (
            emoji(config, "❌", "[ERR]"),
            format!("Split stopped in state {}", report.state),
        )
    };

    if !config.use_color {
        return format!("{} {}", mark, text);
    }
    let text = if report.overall_success {
        style(text).green().bold()
    } else if report.state.is_done() {
        style(text).yellow().bold()
    } else {
        style(text).red().bold()
    };
    format!("{} {}", mark, text.force_styling(true))
}

/// Print the counts, warnings and errors of a run
pub fn print_report(config: &OutputConfig, report: &RunReport) {
    println!("{}", verdict(config, report));
    println!("   Scroll version: {}", report.version);
    println!("   Branch: {}", report.branch);
    println!("   Files extracted: {}", report.extracted.len());
    if let (Some(lib), Some(sa)) = (&report.library_matches, &report.standalone_matches) {
        println!(
            "   Rewrite matches: {} (library), {} (standalone)",
            lib.total(),
            sa.total()
        );
    }
    if let Some(builds) = &report.builds {
        for build in builds {
            let mark = if build.success {
                emoji(config, "✅", "[PASS]")
            } else {
                emoji(config, "❌", "[FAIL]")
            };
            println!(
                "   {} {:?} build in {:.1}s",
                mark,
                build.tree,
                build.duration.as_secs_f64()
            );
        }
    } else if report.verification_skipped {
        println!("   Build verification skipped");
    }
    for published in &report.published {
        println!("   Published {:?}: {}", published.tree, published.reference);
    }

    for warning in &report.warnings {
        println!("{} {}", emoji(config, "⚠️", "[WARN]"), warning);
    }
    for error in &report.errors {
        eprintln!("{} {}", emoji(config, "❌", "[ERR]"), error);
    }
}
