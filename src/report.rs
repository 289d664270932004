//! # Run Report
//!
//! The orchestrator owns a [`ReportBuilder`] for the duration of a run and
//! appends to it as stages complete. [`ReportBuilder::finalize`] consumes the
//! builder and yields the immutable [`RunReport`], which serializes to JSON
//! and renders as Markdown.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::descriptor::{BuildDescriptor, TreeKind};
use crate::error::MissingFile;
use crate::phases::extract::{ExtractionUnit, TrimSummary};
use crate::phases::transform::{MatchCounts, RuleCount};
use crate::phases::verify::BuildResult;
use crate::phases::{RunState, Stage};

/// Number of log lines kept per build
pub const LOG_EXCERPT_LINES: usize = 40;

/// One completed or failed stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub success: bool,
    pub message: String,
    pub duration: Duration,
}

/// Build verification of one tree, as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub tree: TreeKind,
    pub success: bool,
    pub timed_out: bool,
    pub duration: Duration,
    /// Last lines of the build log
    pub log_excerpt: String,
}

impl BuildSummary {
    pub fn from_result(tree: TreeKind, result: &BuildResult) -> Self {
        Self {
            tree,
            success: result.success,
            timed_out: result.timed_out,
            duration: result.duration,
            log_excerpt: result.log_tail(LOG_EXCERPT_LINES),
        }
    }
}

/// A tree handed to the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub tree: TreeKind,
    pub reference: String,
}

/// The finalized record of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub version: String,
    pub branch: String,
    pub source_commit: Option<String>,
    pub dry_run: bool,
    pub state: RunState,
    pub overall_success: bool,
    pub stages: Vec<StageOutcome>,
    pub missing_files: Vec<MissingFile>,
    pub unexpected_files: Vec<PathBuf>,
    pub extracted: Vec<ExtractionUnit>,
    pub trimmed: Option<TrimSummary>,
    /// Rule totals across both trees, in rule order
    pub rules: Vec<RuleCount>,
    pub library_matches: Option<MatchCounts>,
    pub standalone_matches: Option<MatchCounts>,
    pub descriptors: Vec<BuildDescriptor>,
    /// `None` when verification was skipped or never reached
    pub builds: Option<Vec<BuildSummary>>,
    pub verification_skipped: bool,
    pub published: Vec<Published>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Append-only accumulator owned by the orchestrator
#[derive(Debug)]
pub struct ReportBuilder {
    report: RunReport,
}

impl ReportBuilder {
    pub fn new(version: &semver::Version, branch: &str, dry_run: bool) -> Self {
        Self {
            report: RunReport {
                version: version.to_string(),
                branch: branch.to_string(),
                source_commit: None,
                dry_run,
                state: RunState::Failed(Stage::Loaded),
                overall_success: false,
                stages: Vec::new(),
                missing_files: Vec::new(),
                unexpected_files: Vec::new(),
                extracted: Vec::new(),
                trimmed: None,
                rules: Vec::new(),
                library_matches: None,
                standalone_matches: None,
                descriptors: Vec::new(),
                builds: None,
                verification_skipped: false,
                published: Vec::new(),
                warnings: Vec::new(),
                errors: Vec::new(),
            },
        }
    }

    pub fn source_commit(&mut self, commit: Option<String>) {
        self.report.source_commit = commit;
    }

    pub fn stage(&mut self, stage: Stage, message: impl Into<String>, duration: Duration) {
        self.report.stages.push(StageOutcome {
            stage,
            success: true,
            message: message.into(),
            duration,
        });
    }

    pub fn stage_failed(&mut self, stage: Stage, error: impl Into<String>, duration: Duration) {
        let error = error.into();
        self.report.stages.push(StageOutcome {
            stage,
            success: false,
            message: error.clone(),
            duration,
        });
        self.report.errors.push(error);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.report.warnings.push(warning.into());
    }

    pub fn missing_files(&mut self, files: Vec<MissingFile>) {
        self.report.missing_files.extend(files);
    }

    pub fn unexpected_files(&mut self, files: Vec<PathBuf>) {
        self.report.unexpected_files.extend(files);
    }

    pub fn extracted(&mut self, units: &[ExtractionUnit]) {
        self.report.extracted.extend_from_slice(units);
    }

    pub fn trimmed(&mut self, summary: TrimSummary) {
        self.report.trimmed = Some(summary);
    }

    /// Record both trees' match counts; rule totals are summed.
    pub fn matches(&mut self, library: MatchCounts, standalone: MatchCounts) {
        let mut rules = library.per_rule.clone();
        for (total, other) in rules.iter_mut().zip(&standalone.per_rule) {
            total.matches += other.matches;
        }
        self.report.rules = rules;
        self.report.library_matches = Some(library);
        self.report.standalone_matches = Some(standalone);
    }

    pub fn descriptor(&mut self, descriptor: BuildDescriptor) {
        self.report.descriptors.push(descriptor);
    }

    pub fn build(&mut self, summary: BuildSummary) {
        self.report.builds.get_or_insert_with(Vec::new).push(summary);
    }

    pub fn verification_skipped(&mut self) {
        self.report.verification_skipped = true;
    }

    pub fn published(&mut self, tree: TreeKind, reference: impl Into<String>) {
        self.report.published.push(Published {
            tree,
            reference: reference.into(),
        });
    }

    /// Short text handed to the publisher as the change description
    pub fn excerpt(&self) -> String {
        self.report.summary()
    }

    /// Seal the report with the run's final state.
    ///
    /// A run succeeds overall when it reached `Done` and no verified build
    /// failed.
    pub fn finalize(mut self, state: RunState) -> RunReport {
        let builds_ok = self
            .report
            .builds
            .as_ref()
            .map(|b| b.iter().all(|s| s.success))
            .unwrap_or(true);
        self.report.state = state;
        self.report.overall_success = state.is_done() && builds_ok;
        self.report
    }
}

fn verification_label(report: &RunReport) -> &'static str {
    match &report.builds {
        _ if report.verification_skipped => "Skipped",
        None => "Not reached",
        Some(builds) if builds.iter().all(|b| b.success) => "Passed",
        Some(_) => "Failed",
    }
}

impl RunReport {
    /// Files of the standalone tree that were rewritten or regenerated
    pub fn standalone_files_modified(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .standalone_matches
            .iter()
            .flat_map(|m| m.per_file.iter())
            .filter(|(_, n)| **n > 0)
            .map(|(p, _)| p.clone())
            .collect();
        for descriptor in self
            .descriptors
            .iter()
            .filter(|d| d.kind == TreeKind::Standalone)
        {
            files.extend(descriptor.files.keys().cloned());
        }
        files.sort();
        files.dedup();
        files
    }

    /// Plain-text summary for change descriptions
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Automated split from Scroll {}", self.version);
        let _ = writeln!(out);
        if let Some(commit) = &self.source_commit {
            let _ = writeln!(out, "Source: Scroll commit {}", commit);
        }
        let _ = writeln!(out, "- Scene files extracted: {}", self.extracted.len());
        let _ = writeln!(
            out,
            "- Standalone files modified: {}",
            self.standalone_files_modified().len()
        );
        let _ = writeln!(
            out,
            "- Rewrite matches: {}",
            self.rules.iter().map(|r| r.matches).sum::<usize>()
        );
        let _ = writeln!(out, "- Build verification: {}", verification_label(self));
        out
    }

    /// Render in the Markdown report layout
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Scroll Split Operation Report\n");
        let _ = writeln!(md, "**Scroll Version**: {}", self.version);
        let _ = writeln!(
            md,
            "**Scroll Commit**: {}",
            self.source_commit.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(md, "**Branch**: {}", self.branch);
        let _ = writeln!(md, "**Final State**: {}", self.state);
        let _ = writeln!(
            md,
            "**Status**: {}\n",
            if self.overall_success { "SUCCESS" } else { "FAILED" }
        );

        let _ = writeln!(md, "## Summary\n");
        let _ = writeln!(md, "- Scene files extracted: {}", self.extracted.len());
        let _ = writeln!(
            md,
            "- Standalone files modified: {}",
            self.standalone_files_modified().len()
        );
        let _ = writeln!(md, "- Build verification: {}", verification_label(self));
        let _ = writeln!(md, "- Errors: {}", self.errors.len());
        let _ = writeln!(md, "- Warnings: {}\n", self.warnings.len());

        if !self.stages.is_empty() {
            let _ = writeln!(md, "## Stages\n");
            for stage in &self.stages {
                let _ = writeln!(
                    md,
                    "- {} {} ({:.2}s): {}",
                    if stage.success { "[ok]" } else { "[failed]" },
                    stage.stage,
                    stage.duration.as_secs_f64(),
                    stage.message
                );
            }
            let _ = writeln!(md);
        }

        if !self.errors.is_empty() {
            let _ = writeln!(md, "## Errors\n");
            for error in &self.errors {
                let _ = writeln!(md, "- {}", error);
            }
            let _ = writeln!(md);
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(md, "## Warnings\n");
            for warning in &self.warnings {
                let _ = writeln!(md, "- {}", warning);
            }
            let _ = writeln!(md);
        }

        if !self.missing_files.is_empty() {
            let _ = writeln!(md, "## Missing Files\n");
            for missing in &self.missing_files {
                let _ = writeln!(md, "- `{}`", missing.path.display());
            }
            let _ = writeln!(md);
        }

        let _ = writeln!(md, "## Scene Files Extracted\n");
        let mut extracted: Vec<&ExtractionUnit> = self.extracted.iter().collect();
        extracted.sort_by(|a, b| a.destination.cmp(&b.destination));
        for unit in extracted {
            let _ = writeln!(
                md,
                "- `{}` from `{}` ({} bytes)",
                unit.destination.display(),
                unit.source.display(),
                unit.size
            );
        }

        let _ = writeln!(md, "\n## Standalone Files Modified\n");
        for path in self.standalone_files_modified() {
            let _ = writeln!(md, "- `{}`", path.display());
        }

        if !self.rules.is_empty() {
            let _ = writeln!(md, "\n## Rewrite Rules\n");
            let _ = writeln!(md, "| Rule | Replacement | Matches |");
            let _ = writeln!(md, "|---|---|---|");
            for rule in &self.rules {
                let _ = writeln!(
                    md,
                    "| `{}` | `{}` | {} |",
                    rule.from.replace('|', "\\|"),
                    rule.to.replace('|', "\\|"),
                    rule.matches
                );
            }
        }

        if let Some(builds) = &self.builds {
            let _ = writeln!(md, "\n## Build Verification\n");
            for build in builds {
                let name = match build.tree {
                    TreeKind::Library => "library",
                    TreeKind::Standalone => "standalone",
                };
                let status = if build.success {
                    "PASSED"
                } else if build.timed_out {
                    "TIMED OUT"
                } else {
                    "FAILED"
                };
                let _ = writeln!(
                    md,
                    "### {} ({}, {:.1}s)\n",
                    name,
                    status,
                    build.duration.as_secs_f64()
                );
                let _ = writeln!(md, "```\n{}\n```\n", build.log_excerpt);
            }
        }

        if !self.published.is_empty() {
            let _ = writeln!(md, "\n## Published\n");
            for published in &self.published {
                let _ = writeln!(md, "- {:?}: {}", published.tree, published.reference);
            }
        }

        md
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
