//! Handing finished trees to a publishing collaborator
//!
//! Opening pull requests against a hosting service is out of this crate's
//! hands; the orchestrator only talks to a [`Publisher`]. The shipped
//! implementation commits each tree onto a local branch, which is what a CI
//! job would then push and open a PR from.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::git;

/// Where a published tree can be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrReference(pub String);

impl fmt::Display for PrReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives finished trees
pub trait Publisher {
    /// Publish `tree` on `branch_name`, described by `report_excerpt`.
    fn publish(&self, tree: &Path, branch_name: &str, report_excerpt: &str) -> Result<PrReference>;
}

/// Commits the tree onto a local git branch.
///
/// The reference returned is `branch@commit`.
#[derive(Debug, Clone, Default)]
pub struct GitBranchPublisher;

impl Publisher for GitBranchPublisher {
    fn publish(&self, tree: &Path, branch_name: &str, report_excerpt: &str) -> Result<PrReference> {
        let title = report_excerpt
            .lines()
            .next()
            .unwrap_or("Automated split")
            .to_string();
        let message = format!("{}\n\n{}", title, report_excerpt);
        let commit = git::commit_branch(tree, branch_name, &message)?;
        Ok(PrReference(format!("{}@{}", branch_name, commit)))
    }
}
