//! Orchestrator for a complete split run
//!
//! Sequences the stages, owns the run report, and decides whether the trees
//! get published. The run is linear with early exit:
//!
//! `Loaded -> Extracted -> Transformed -> Described -> Verified -> Done`
//!
//! Manifest, extraction, transform and descriptor errors stop the run in
//! `Failed(stage)`. A failed build does not: the run still reaches `Done`,
//! with `overall_success = false`. Either way [`Orchestrator::run`] returns
//! the finalized report.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};

use super::extract::{extract, trim};
use super::transform::transform_with;
use super::verify::{verify_pair, VerifyOptions};
use super::{RunState, Stage, Workspace};
use crate::descriptor::{
    synthesize_library, synthesize_standalone, LibraryDependency, OriginalDescriptor, TreeKind,
};
use crate::error::{Error, Result};
use crate::git;
use crate::manifest::{Manifest, RedirectHeader};
use crate::publish::{GitBranchPublisher, Publisher};
use crate::report::{BuildSummary, ReportBuilder, RunReport};

/// Branch name used when none is given
pub fn default_branch(version: &semver::Version) -> String {
    format!("update-{}", version)
}

/// Everything a run needs, passed in explicitly
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub manifest_path: PathBuf,
    pub source_root: PathBuf,
    pub workspace: Workspace,
    pub version: semver::Version,
    pub branch: String,
    /// Suppresses publishing only
    pub dry_run: bool,
    pub create_prs: bool,
    /// `None` skips verification
    pub verify: Option<VerifyOptions>,
}

impl RunConfig {
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        workspace: Workspace,
        version: semver::Version,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            source_root: source_root.into(),
            workspace,
            branch: default_branch(&version),
            version,
            dry_run: false,
            create_prs: false,
            verify: None,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn create_prs(mut self, create_prs: bool) -> Self {
        self.create_prs = create_prs;
        self
    }

    pub fn verify(mut self, options: Option<VerifyOptions>) -> Self {
        self.verify = options;
        self
    }
}

/// Drives one split run
pub struct Orchestrator {
    config: RunConfig,
    publisher: Box<dyn Publisher>,
    progress: Option<Box<dyn Fn(&str)>>,
}

/// The stage in flight and when it started
struct Cursor {
    stage: Stage,
    started: Instant,
}

impl Cursor {
    fn begin(&mut self, stage: Stage) {
        self.stage = stage;
        self.started = Instant::now();
    }
}

impl Orchestrator {
    /// Orchestrator publishing through local git branches
    pub fn new(config: RunConfig) -> Self {
        Self::with_publisher(config, Box::new(GitBranchPublisher))
    }

    pub fn with_publisher(config: RunConfig, publisher: Box<dyn Publisher>) -> Self {
        Self {
            config,
            publisher,
            progress: None,
        }
    }

    /// Called with a short message as each stage starts
    pub fn on_progress(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn progress(&self, message: &str) {
        info!("{}", message);
        if let Some(callback) = &self.progress {
            callback(message);
        }
    }

    /// Run every stage and return the finalized report. Never fails.
    pub fn run(&self) -> RunReport {
        let mut report = ReportBuilder::new(
            &self.config.version,
            &self.config.branch,
            self.config.dry_run,
        );
        let mut cursor = Cursor {
            stage: Stage::Loaded,
            started: Instant::now(),
        };

        let state = match self.run_stages(&mut report, &mut cursor) {
            Ok(()) => RunState::Reached(Stage::Done),
            Err(e) => {
                error!("Split failed while {}: {}", stage_activity(cursor.stage), e);
                report.stage_failed(cursor.stage, e.to_string(), cursor.started.elapsed());
                RunState::Failed(cursor.stage)
            }
        };

        let report = report.finalize(state);
        if report.overall_success {
            info!("Split of {} completed successfully", report.version);
        } else {
            warn!("Split of {} finished in state {}", report.version, report.state);
        }
        report
    }

    fn run_stages(&self, report: &mut ReportBuilder, cursor: &mut Cursor) -> Result<()> {
        let config = &self.config;
        let workspace = &config.workspace;

        // Load
        cursor.begin(Stage::Loaded);
        self.progress("Loading manifest");
        let manifest = Manifest::load(&config.manifest_path)?;
        workspace.check_layout(&config.source_root)?;
        report.source_commit(git::rev_parse_head(&config.source_root));

        let missing = manifest.validate(&config.source_root);
        if !missing.is_empty() {
            report.missing_files(missing.clone());
            return Err(Error::MissingFiles { files: missing });
        }
        let unexpected = manifest.unexpected_files(&config.source_root);
        if !unexpected.is_empty() {
            report.warn(format!(
                "found {} unexpected file(s) under the subsystem root",
                unexpected.len()
            ));
            report.unexpected_files(unexpected);
        }
        report.stage(
            Stage::Loaded,
            format!(
                "{} implementation file(s), {} header(s), {} rewrite rule(s)",
                manifest.implementation_files().len(),
                manifest.header_files().len(),
                manifest.rewrite_rules().len()
            ),
            cursor.started.elapsed(),
        );

        // Extract
        cursor.begin(Stage::Extracted);
        self.progress("Extracting scene files");
        for root in [&workspace.library, &workspace.standalone] {
            reset_tree(root).map_err(|e| Error::Extraction {
                path: root.clone(),
                message: format!("cannot prepare output tree: {}", e),
            })?;
        }
        let units = extract(&manifest, &config.source_root, &workspace.library)?;
        report.extracted(&units);
        let trimmed = trim(&manifest, &config.source_root, &workspace.standalone, &units)?;
        report.stage(
            Stage::Extracted,
            format!(
                "{} file(s) extracted, {} copied into the standalone tree",
                units.len(),
                trimmed.copied
            ),
            cursor.started.elapsed(),
        );
        report.trimmed(trimmed);

        // Transform
        cursor.begin(Stage::Transformed);
        self.progress("Rewriting includes");
        let rules = manifest.rewrite_rules();
        let eligible = |p: &Path| manifest.is_eligible(p);
        let library_counts = transform_with(&workspace.library, rules, eligible)?;
        let standalone_counts = transform_with(&workspace.standalone, rules, eligible)?;
        let redirects = write_redirect_headers(manifest.redirect_headers(), &workspace.standalone)?;

        for (rule, (lib, sa)) in rules
            .iter()
            .zip(library_counts.per_rule.iter().zip(&standalone_counts.per_rule))
        {
            if lib.matches + sa.matches == 0 {
                warn!("Rewrite rule '{}' matched nothing", rule.from());
                report.warn(format!("rewrite rule '{}' matched nothing", rule.from()));
            }
        }
        for (tree, counts) in [
            ("library", &library_counts),
            ("standalone", &standalone_counts),
        ] {
            for path in &counts.skipped_undecodable {
                report.warn(format!(
                    "{} tree: {} is not valid UTF-8, its includes were not rewritten",
                    tree,
                    path.display()
                ));
            }
        }
        report.stage(
            Stage::Transformed,
            format!(
                "{} match(es) in the library tree, {} in the standalone tree, {} redirect header(s)",
                library_counts.total(),
                standalone_counts.total(),
                redirects
            ),
            cursor.started.elapsed(),
        );
        report.matches(library_counts, standalone_counts);

        // Describe
        cursor.begin(Stage::Described);
        self.progress("Generating build files");
        let library = synthesize_library(&manifest, &units, &config.version)?;
        library.write_to(&workspace.library)?;

        let original = OriginalDescriptor::load(&workspace.standalone)?.without_sources(&units)?;
        let dependency = LibraryDependency::from_manifest(&manifest, &config.version);
        let standalone = synthesize_standalone(&original, &config.version, &dependency)?;
        standalone.write_to(&workspace.standalone)?;

        for note in library.notes.iter().chain(&standalone.notes) {
            report.warn(note.clone());
        }
        report.stage(
            Stage::Described,
            format!(
                "library lists {} source(s); {} source entr(ies) removed from the standalone tree",
                library.sources.len(),
                original.removed_sources().len()
            ),
            cursor.started.elapsed(),
        );
        report.descriptor(library);
        report.descriptor(standalone);

        // Verify
        cursor.begin(Stage::Verified);
        match &config.verify {
            None => {
                info!("Build verification skipped");
                report.verification_skipped();
                report.stage(Stage::Verified, "skipped", cursor.started.elapsed());
            }
            Some(options) => {
                self.progress("Verifying builds");
                let (library, standalone) =
                    verify_pair(&workspace.library, &workspace.standalone, options);
                report.build(BuildSummary::from_result(TreeKind::Library, &library));
                report.build(BuildSummary::from_result(TreeKind::Standalone, &standalone));

                let message = format!(
                    "library build {}, standalone build {}",
                    pass_fail(library.success),
                    pass_fail(standalone.success)
                );
                if library.success && standalone.success {
                    report.stage(Stage::Verified, message, cursor.started.elapsed());
                } else {
                    report.stage_failed(Stage::Verified, message, cursor.started.elapsed());
                }
            }
        }

        // Done
        cursor.begin(Stage::Done);
        if config.create_prs && !config.dry_run {
            self.progress("Publishing branches");
            self.publish(report);
        } else if config.create_prs {
            info!("Dry run: publishing skipped");
        }
        report.stage(Stage::Done, "complete", cursor.started.elapsed());

        Ok(())
    }

    /// Publish both trees. Failures become warnings.
    fn publish(&self, report: &mut ReportBuilder) {
        let workspace = &self.config.workspace;
        let branch = &self.config.branch;
        let excerpt = report.excerpt();

        let library_ref = match self.publisher.publish(&workspace.library, branch, &excerpt) {
            Ok(reference) => {
                report.published(TreeKind::Library, reference.0.clone());
                Some(reference)
            }
            Err(e) => {
                report.warn(format!("failed to publish the library tree: {}", e));
                None
            }
        };

        let related = library_ref
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("not published");
        let excerpt = format!("{}\nRelated library change: {}\n", excerpt, related);
        match self.publisher.publish(&workspace.standalone, branch, &excerpt) {
            Ok(reference) => report.published(TreeKind::Standalone, reference.0),
            Err(e) => report.warn(format!("failed to publish the standalone tree: {}", e)),
        }
    }
}

fn pass_fail(success: bool) -> &'static str {
    if success {
        "passed"
    } else {
        "failed"
    }
}

fn stage_activity(stage: Stage) -> &'static str {
    match stage {
        Stage::Loaded => "loading the manifest",
        Stage::Extracted => "extracting",
        Stage::Transformed => "transforming",
        Stage::Described => "generating build descriptors",
        Stage::Verified => "verifying builds",
        Stage::Done => "publishing",
    }
}

/// Empty `root` of everything but its `.git`, creating it if needed.
///
/// Refuses a root that does not end in a plain directory name.
fn reset_tree(root: &Path) -> std::io::Result<()> {
    if !matches!(root.components().next_back(), Some(Component::Normal(_))) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to empty {}", root.display()),
        ));
    }
    fs::create_dir_all(root)?;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Write stub headers at old include paths that re-include the library's.
///
/// Returns the number written.
fn write_redirect_headers(redirects: &[RedirectHeader], standalone: &Path) -> Result<usize> {
    for redirect in redirects {
        let include = redirect.include.trim();
        let include = if include.starts_with('<') || include.starts_with('"') {
            include.to_string()
        } else {
            format!("<{}>", include)
        };
        let content = format!(
            "/* This header moved to an external library. */\n#pragma once\n#include {}\n",
            include
        );

        let target = standalone.join(&redirect.path);
        let io_err = |e: std::io::Error| Error::Transform {
            path: PathBuf::from(&redirect.path),
            message: format!("cannot write redirect header: {}", e),
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&target, content).map_err(io_err)?;
    }
    Ok(redirects.len())
}
