//! # Error Handling
//!
//! This module defines the centralized error type for the split pipeline. It
//! uses `thiserror` to build one `Error` enum whose variants follow the
//! pipeline stages, so a caller can tell from the variant alone which stage
//! gave up.
//!
//! ## Key Components
//!
//! - **`Error`**: every failure the library can raise. The stage variants are:
//!   - `Manifest`: malformed or structurally invalid manifest (pre-flight).
//!   - `MissingFiles`: the manifest names files that are not in the source
//!     tree (pre-flight). All missing files are carried together.
//!   - `Workspace`: an output tree overlaps the source tree or the other
//!     output tree (pre-flight).
//!   - `Extraction`, `Transform`, `BuildDescriptor`: I/O or parse failures
//!     inside the matching stage, each naming the offending path.
//!
//! - **`MissingFile`**: one manifest path that does not exist under the
//!   source root. `Manifest::validate` returns these as plain values rather
//!   than raising, so that every missing file is reported at once.
//!
//! - **`Result<T>`**: alias for `std::result::Result<T, Error>`.
//!
//! A failed build is deliberately absent from this list: the verifier reports
//! it as `BuildResult { success: false, .. }`.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// A manifest path that does not exist in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFile {
    /// The path as written in the manifest, relative to the source root.
    pub path: PathBuf,
}

impl fmt::Display for MissingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing source file: {}", self.path.display())
    }
}

/// Main error type for scroll-split operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest could not be read or is structurally invalid.
    ///
    /// This covers missing required keys, duplicate paths, malformed rewrite
    /// rules and unreadable template files.
    #[error("Manifest error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Manifest {
        message: String,
        /// Optional hint for how to fix the manifest
        hint: Option<String>,
    },

    /// One or more manifest paths do not exist under the source root.
    #[error("Manifest references {} missing file(s): {}", files.len(), join_missing(files))]
    MissingFiles { files: Vec<MissingFile> },

    /// The output trees are not disjoint from the source tree or each other.
    #[error("Workspace error: {}: {message}", path.display())]
    Workspace { path: PathBuf, message: String },

    /// A file could not be extracted into the library tree.
    #[error("Extraction error for {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    /// A file could not be read or rewritten by the transformer.
    #[error("Transform error for {}: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    /// A build descriptor could not be parsed, rendered or written.
    #[error("Build descriptor error for {}: {message}", path.display())]
    BuildDescriptor { path: PathBuf, message: String },

    /// The publishing collaborator failed to hand off a tree.
    #[error("Publish error for {}: {message}", tree.display())]
    Publish { tree: PathBuf, message: String },

    /// An external command could not be run.
    #[error("Process error: {command} - {message}")]
    Process { command: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

fn join_missing(files: &[MissingFile]) -> String {
    files
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Shorthand for a manifest error without a hint.
    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        Error::Manifest {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
