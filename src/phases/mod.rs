//! Stages of a split run.
//!
//! ## Overview
//!
//! A run moves through these stages, each consuming the previous one's
//! output on disk:
//! 1. Load - read and validate the manifest against the source tree
//! 2. Extract - copy the subsystem into the library tree, and the rest into
//!    the standalone tree
//! 3. Transform - apply the rewrite rules to both trees
//! 4. Describe - synthesize the build descriptors of both trees
//! 5. Verify - configure and compile both trees in sandboxes
//!
//! The orchestrator sequences them and keeps the run report.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::path::{overlaps, resolve};

pub mod extract;
pub mod orchestrator;
pub mod transform;
pub mod verify;
pub mod write;

/// Position of a run in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Loaded,
    Extracted,
    Transformed,
    Described,
    Verified,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loaded => "loaded",
            Stage::Extracted => "extracted",
            Stage::Transformed => "transformed",
            Stage::Described => "described",
            Stage::Verified => "verified",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "lowercase")]
pub enum RunState {
    /// Reached `stage` and stopped there
    Reached(Stage),
    /// The named stage raised
    Failed(Stage),
}

impl RunState {
    pub fn is_done(&self) -> bool {
        matches!(self, RunState::Reached(Stage::Done))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Reached(stage) => write!(f, "{}", stage),
            RunState::Failed(stage) => write!(f, "failed({})", stage),
        }
    }
}

/// The two output trees of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub library: PathBuf,
    pub standalone: PathBuf,
}

impl Workspace {
    /// `scene-scroll/` and `scroll-standalone/` under `root`
    pub fn under(root: &Path, library_name: &str) -> Self {
        Self {
            library: root.join(library_name),
            standalone: root.join("scroll-standalone"),
        }
    }

    /// Check that the two output trees and `source_root` are pairwise disjoint.
    ///
    /// Paths are compared after symlinks and `..` are resolved. A tree whose
    /// last component is not a plain name (`ws/..`) is rejected outright.
    pub fn check_layout(&self, source_root: &Path) -> Result<()> {
        let resolved = |path: &Path| {
            resolve(path).map_err(|e| workspace_error(path, format!("cannot resolve: {}", e)))
        };
        let source = resolved(source_root)?;
        let mut trees = Vec::with_capacity(2);

        for (kind, tree) in [("library", &self.library), ("standalone", &self.standalone)] {
            if !matches!(tree.components().next_back(), Some(Component::Normal(_))) {
                return Err(workspace_error(
                    tree,
                    format!("the {} tree must end in a directory name", kind),
                ));
            }
            let tree = resolved(tree.as_path())?;
            if overlaps(&tree, &source) {
                return Err(workspace_error(
                    &tree,
                    format!(
                        "the {} tree overlaps the source tree {}",
                        kind,
                        source.display()
                    ),
                ));
            }
            trees.push(tree);
        }

        if overlaps(&trees[0], &trees[1]) {
            return Err(workspace_error(
                &trees[0],
                format!("the library tree overlaps the standalone tree {}", trees[1].display()),
            ));
        }
        Ok(())
    }
}

fn workspace_error(path: &Path, message: String) -> Error {
    Error::Workspace {
        path: path.to_path_buf(),
        message,
    }
}
