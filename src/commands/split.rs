//! # Split Command Implementation
//!
//! Runs the whole pipeline for one Scroll version: extract, transform,
//! describe, optionally verify, then publish unless told otherwise. The
//! report is written next to the output trees as
//! `split_report_<version>.md` and `split_report_<version>.json`.
//!
//! ```bash
//! scroll-split split 1.11.3 --source ~/src/scroll --workspace /tmp/split --no-prs
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use scroll_split::git;
use scroll_split::manifest::{Manifest, DEFAULT_LIBRARY_NAME};
use scroll_split::output::{emoji, print_report, spinner, OutputConfig};
use scroll_split::phases::orchestrator::{Orchestrator, RunConfig};
use scroll_split::phases::verify::{VerifyOptions, DEFAULT_TIMEOUT};
use scroll_split::phases::Workspace;
use scroll_split::report::RunReport;

/// Split a Scroll release into the library and standalone trees
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Scroll version to split, e.g. 1.11.3 or v1.11.3
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Path to the split manifest (YAML or JSON)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SCROLL_SPLIT_MANIFEST",
        default_value = "split_manifest.yaml"
    )]
    pub manifest: PathBuf,

    /// Scroll source tree to split
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Directory receiving both output trees and the report.
    ///
    /// A fresh temporary directory is used when omitted.
    #[arg(short, long, value_name = "DIR", env = "SCROLL_SPLIT_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Build the trees but do not publish them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip publishing
    #[arg(long)]
    pub no_prs: bool,

    /// Configure and compile both trees after generating them
    #[arg(long)]
    pub verify_builds: bool,

    /// Time limit for each tree's build verification, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub build_timeout: u64,

    /// Branch name for published trees (default: update-<version>)
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `split` command.
///
/// Fails, and so exits non-zero, unless the run succeeds overall.
pub fn execute(args: SplitArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let version = git::parse_semver_tag(&args.version).ok_or_else(|| {
        anyhow!(
            "Invalid Scroll version '{}': expected MAJOR.MINOR.PATCH",
            args.version
        )
    })?;

    let workspace_root = match &args.workspace {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create workspace {}", dir.display()))?;
            dir.clone()
        }
        None => tempfile::Builder::new()
            .prefix("scroll_split_")
            .tempdir()
            .context("Cannot create a temporary workspace")?
            .into_path(),
    };

    // The library tree is named after the library; a broken manifest is
    // reported by the run itself.
    let library_name = Manifest::load(&args.manifest)
        .map(|m| m.library().name.clone())
        .unwrap_or_else(|_| DEFAULT_LIBRARY_NAME.to_string());

    let mut config = RunConfig::new(
        &args.manifest,
        &args.source,
        Workspace::under(&workspace_root, &library_name),
        version.clone(),
    )
    .dry_run(args.dry_run)
    .create_prs(!args.no_prs);
    if let Some(branch) = &args.branch {
        config = config.branch(branch.clone());
    }
    if args.verify_builds {
        config = config.verify(Some(
            VerifyOptions::default().with_timeout(Duration::from_secs(args.build_timeout)),
        ));
    }

    if !args.quiet {
        println!("{} Scroll split {}", emoji(&out, "🔀", "[SPLIT]"), version);
        if args.dry_run {
            println!(
                "{} DRY RUN MODE - trees are generated but not published",
                emoji(&out, "🔎", "[DRY-RUN]")
            );
        }
        println!("   Workspace: {}", workspace_root.display());
        println!();
    }

    let bar = spinner(&out, args.quiet, "Starting");
    let status = bar.clone();
    let report = Orchestrator::new(config)
        .on_progress(move |message| status.set_message(message.to_string()))
        .run();
    bar.finish_and_clear();

    let (markdown, _json) = write_report(&report, &workspace_root)?;

    if !args.quiet {
        print_report(&out, &report);
        println!("   Report: {}", markdown.display());
    }

    if report.overall_success {
        Ok(())
    } else {
        Err(anyhow!(
            "Split of Scroll {} did not succeed (state {})",
            report.version,
            report.state
        ))
    }
}

/// Write the Markdown and JSON renderings of `report` into `dir`.
pub fn write_report(report: &RunReport, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let markdown = dir.join(format!("split_report_{}.md", report.version));
    let json = dir.join(format!("split_report_{}.json", report.version));

    fs::write(&markdown, report.to_markdown())
        .with_context(|| format!("Cannot write {}", markdown.display()))?;
    fs::write(&json, report.to_json()?)
        .with_context(|| format!("Cannot write {}", json.display()))?;

    Ok((markdown, json))
}
