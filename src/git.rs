//! Thin wrappers over the system `git` command
//!
//! The system binary is used rather than a library so that the user's own
//! configuration (identity, hooks, signing) applies to commits made here.

use std::path::Path;

use log::{debug, info};
use semver::Version;

use crate::error::{Error, Result};
use crate::process::ProcessBuilder;

/// Identity used when the repository has none configured
const FALLBACK_NAME: &str = "scroll-split";
const FALLBACK_EMAIL: &str = "scroll-split@localhost";

fn git(repo: &Path) -> ProcessBuilder {
    ProcessBuilder::new("git").cwd(repo)
}

/// Commit hash checked out in `repo`, if it is a git work tree with commits
pub fn rev_parse_head(repo: &Path) -> Option<String> {
    let output = git(repo).args(["rev-parse", "HEAD"]).exec().ok()?;
    if !output.status.success() {
        debug!("No HEAD commit in {}", repo.display());
        return None;
    }
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!commit.is_empty()).then_some(commit)
}

fn has_head(repo: &Path) -> bool {
    git(repo)
        .args(["rev-parse", "--verify", "-q", "HEAD"])
        .exec()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn has_identity(repo: &Path) -> bool {
    git(repo)
        .args(["config", "user.email"])
        .exec()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Commit everything in `tree` onto `branch`, creating the repository and
/// the branch as needed.
///
/// An existing branch is reset to the current commit before committing, so
/// reruns stack a fresh commit on the checked-out history. Returns the new
/// commit hash.
pub fn commit_branch(tree: &Path, branch: &str, message: &str) -> Result<String> {
    let publish_error = |message: String| Error::Publish {
        tree: tree.to_path_buf(),
        message,
    };

    if !tree.join(".git").exists() {
        git(tree).args(["init", "-q"]).exec_and_check()?;
        debug!("Initialized repository in {}", tree.display());
    }

    if has_head(tree) {
        git(tree).args(["checkout", "-q", "-B", branch]).exec_and_check()?;
    } else {
        git(tree)
            .args(["symbolic-ref", "HEAD"])
            .arg(format!("refs/heads/{}", branch))
            .exec_and_check()?;
    }

    git(tree).args(["add", "-A"]).exec_and_check()?;

    let mut commit = git(tree);
    if !has_identity(tree) {
        commit = commit
            .env("GIT_AUTHOR_NAME", FALLBACK_NAME)
            .env("GIT_AUTHOR_EMAIL", FALLBACK_EMAIL)
            .env("GIT_COMMITTER_NAME", FALLBACK_NAME)
            .env("GIT_COMMITTER_EMAIL", FALLBACK_EMAIL);
    }
    commit
        .args(["commit", "-q", "--allow-empty", "-m", message])
        .exec_and_check()?;

    let head = rev_parse_head(tree)
        .ok_or_else(|| publish_error("commit succeeded but HEAD is unreadable".to_string()))?;
    info!("Committed {} on {} in {}", head, branch, tree.display());
    Ok(head)
}

/// Parse a release tag such as `v1.11.3` or `1.11.3` into a version
pub fn parse_semver_tag(tag: &str) -> Option<Version> {
    let version_str = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(version_str).ok()
}
