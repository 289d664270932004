//! # Validate Command Implementation
//!
//! Loads a split manifest and checks it against a Scroll source tree
//! without writing anything:
//!
//! - the manifest parses and its rules compile,
//! - every listed implementation and header file exists,
//! - no file under the subsystem root is left out of the manifest (a
//!   warning, or an error with `--strict`).

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use scroll_split::manifest::Manifest;
use scroll_split::output::{emoji, OutputConfig};

/// Check a manifest against a Scroll source tree
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the split manifest (YAML or JSON)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SCROLL_SPLIT_MANIFEST",
        default_value = "split_manifest.yaml"
    )]
    pub manifest: PathBuf,

    /// Scroll source tree to check against
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Treat unexpected files as errors
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating manifest: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.manifest.display()
    );

    let manifest = match Manifest::load(&args.manifest) {
        Ok(manifest) => {
            println!("{} Manifest parsed successfully", emoji(&out, "✅", "[OK]"));
            manifest
        }
        Err(e) => {
            println!("{} Manifest parsing failed: {}", emoji(&out, "❌", "[ERR]"), e);
            return Err(anyhow!("Manifest parsing failed: {}", e));
        }
    };

    println!("\n{} Manifest Summary:", emoji(&out, "📊", "[INFO]"));
    println!("   Library: {}", manifest.library().name);
    println!(
        "   Implementation files: {}",
        manifest.implementation_files().len()
    );
    println!("   Header files: {}", manifest.header_files().len());
    println!("   Rewrite rules: {}", manifest.rewrite_rules().len());
    println!("   Redirect headers: {}", manifest.redirect_headers().len());

    println!(
        "\n{} Checking files under {}...",
        emoji(&out, "🔄", "[CHECK]"),
        args.source.display()
    );
    let missing = manifest.validate(&args.source);
    for file in &missing {
        println!("   {} {}", emoji(&out, "❌", "[MISSING]"), file.path.display());
    }

    let unexpected = manifest.unexpected_files(&args.source);
    for path in &unexpected {
        println!(
            "   {} not in manifest: {}",
            emoji(&out, "⚠️", "[WARN]"),
            path.display()
        );
    }

    if !missing.is_empty() {
        println!(
            "\n{} Validation failed: {} missing file(s)",
            emoji(&out, "❌", "[ERR]"),
            missing.len()
        );
        return Err(anyhow!(
            "Manifest references {} missing file(s)",
            missing.len()
        ));
    }
    if args.strict && !unexpected.is_empty() {
        println!(
            "\n{} Validation failed (strict): {} unexpected file(s)",
            emoji(&out, "❌", "[ERR]"),
            unexpected.len()
        );
        return Err(anyhow!(
            "Found {} unexpected file(s) in strict mode",
            unexpected.len()
        ));
    }

    if unexpected.is_empty() {
        println!("\n{} Manifest is valid", emoji(&out, "✅", "[OK]"));
    } else {
        println!(
            "\n{} Manifest is valid with {} warning(s)",
            emoji(&out, "⚠️", "[WARN]"),
            unexpected.len()
        );
    }
    Ok(())
}
