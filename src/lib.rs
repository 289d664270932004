//! # scroll-split
//!
//! Manifest-driven extraction of the scene-scroll rendering library from a
//! Scroll window manager source tree. One run turns a Scroll checkout into
//! two trees:
//!
//! - the **library tree**, holding the scene subsystem with its own Meson
//!   build, and
//! - the **standalone tree**, the rest of Scroll rewritten to consume the
//!   library as an external dependency.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use scroll_split::manifest::{Format, Manifest};
//!
//! let manifest = Manifest::parse(
//!     r#"
//! scene_files:
//!   implementation:
//!     - sway/tree/scene/scene.c
//! modifications:
//!   include_patterns:
//!     - from: '#include "sway/tree/scene.h"'
//!       to: '#include <scene-scroll/scene.h>'
//!       literal: true
//! "#,
//!     Format::Yaml,
//!     Path::new("."),
//! )
//! .unwrap();
//!
//! assert_eq!(manifest.implementation_files().len(), 1);
//! let (rewritten, matches) = manifest.rewrite_rules()[0].apply("#include \"sway/tree/scene.h\"\n");
//! assert_eq!(matches, 1);
//! assert_eq!(rewritten, "#include <scene-scroll/scene.h>\n");
//! ```
//!
//! ## Modules
//!
//! - **`manifest`**: the split configuration, validated against a source tree.
//! - **`phases`**: the stages of a run (extract, transform, describe, verify)
//!   and the orchestrator sequencing them.
//! - **`descriptor`**: Meson build descriptor analysis and synthesis.
//! - **`report`**: the run report, rendered as Markdown or JSON.
//! - **`publish`**: the hand-off of finished trees.
//! - **`filesystem`**, **`path`**, **`process`**, **`git`**: supporting
//!   plumbing.

pub mod descriptor;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod manifest;
pub mod output;
pub mod path;
pub mod phases;
pub mod process;
pub mod publish;
pub mod report;

#[cfg(test)]
mod path_proptest;
