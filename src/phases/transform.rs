//! Content rewriting of an output tree
//!
//! Every eligible text file gets each rewrite rule applied once, in rule
//! order. Binary files pass through untouched; whether a file is binary is
//! decided from its bytes, never from its name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filesystem::{as_text, is_binary};
use crate::manifest::RewriteRule;

/// Matches of one rule across a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCount {
    pub from: String,
    pub to: String,
    pub matches: usize,
}

/// Match statistics of one [`transform`] call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    /// Total matches per eligible text file, zero included
    pub per_file: BTreeMap<PathBuf, usize>,
    /// Totals per rule, in rule order
    pub per_rule: Vec<RuleCount>,
    /// Binary files left untouched
    pub skipped_binary: Vec<PathBuf>,
    /// Eligible non-binary files that are not valid UTF-8, left unrewritten
    pub skipped_undecodable: Vec<PathBuf>,
    /// Files rewritten on disk
    pub files_changed: usize,
}

impl MatchCounts {
    pub fn total(&self) -> usize {
        self.per_rule.iter().map(|r| r.matches).sum()
    }

    /// Rules that matched nothing
    pub fn unmatched_rules(&self) -> impl Iterator<Item = &RuleCount> {
        self.per_rule.iter().filter(|r| r.matches == 0)
    }
}

/// Apply `rules` to every text file under `tree_root`.
pub fn transform(tree_root: &Path, rules: &[RewriteRule]) -> Result<MatchCounts> {
    transform_with(tree_root, rules, |_| true)
}

/// Apply `rules` to the text files under `tree_root` that `eligible` accepts.
///
/// `eligible` receives paths relative to `tree_root`. Paths in the returned
/// counts are relative too.
pub fn transform_with<F>(tree_root: &Path, rules: &[RewriteRule], eligible: F) -> Result<MatchCounts>
where
    F: Fn(&Path) -> bool,
{
    let mut counts = MatchCounts {
        per_rule: rules
            .iter()
            .map(|r| RuleCount {
                from: r.from().to_string(),
                to: r.to().to_string(),
                matches: 0,
            })
            .collect(),
        ..MatchCounts::default()
    };

    let walker = WalkDir::new(tree_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| Error::Transform {
            path: e.path().unwrap_or(tree_root).to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(tree_root) else {
            continue;
        };
        if !eligible(rel) {
            continue;
        }

        let bytes = std::fs::read(entry.path()).map_err(|e| Error::Transform {
            path: rel.to_path_buf(),
            message: format!("cannot read: {}", e),
        })?;
        let Some(text) = as_text(&bytes) else {
            if is_binary(&bytes) {
                debug!("Skipping binary file {}", rel.display());
                counts.skipped_binary.push(rel.to_path_buf());
            } else {
                warn!("Skipping {}: not valid UTF-8", rel.display());
                counts.skipped_undecodable.push(rel.to_path_buf());
            }
            continue;
        };

        let mut content = text.to_string();
        let mut file_total = 0;
        for (rule, total) in rules.iter().zip(counts.per_rule.iter_mut()) {
            let (replaced, matches) = rule.apply(&content);
            if matches > 0 {
                content = replaced.into_owned();
                file_total += matches;
                total.matches += matches;
            }
        }

        if content != text {
            std::fs::write(entry.path(), &content).map_err(|e| Error::Transform {
                path: rel.to_path_buf(),
                message: format!("cannot write: {}", e),
            })?;
            counts.files_changed += 1;
            debug!("Rewrote {} ({} matches)", rel.display(), file_total);
        }
        counts.per_file.insert(rel.to_path_buf(), file_total);
    }

    info!(
        "Transformed {}: {} file(s) scanned, {} changed, {} matches",
        tree_root.display(),
        counts.per_file.len(),
        counts.files_changed,
        counts.total()
    );

    Ok(counts)
}
