//! Extraction of the subsystem into the library tree, and trimming of the
//! source tree into the standalone tree.
//!
//! Both operations stage everything in a `MemoryFS` first and only write once
//! every file has been read and checked, so a failure leaves no half-written
//! tree behind. The source tree is only ever read.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use walkdir::WalkDir;

use super::write;
use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::manifest::{FileKind, Manifest};
use crate::path::checked_relative;

/// One source file mapped into the library tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionUnit {
    /// Path in the source tree
    pub source: PathBuf,
    /// Path in the library tree
    pub destination: PathBuf,
    pub kind: FileKind,
    /// Size in bytes
    pub size: u64,
}

/// What [`trim`] copied and left out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrimSummary {
    /// Files copied into the standalone tree
    pub copied: usize,
    /// Source-tree files left out, in path order
    pub removed: Vec<PathBuf>,
}

fn extraction_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Error {
    Error::Extraction {
        path: path.into(),
        message: message.into(),
    }
}

/// Copy every manifest file from `source_root` into `dest_root`.
///
/// Implementation files come first, then headers, each in manifest order.
pub fn extract(manifest: &Manifest, source_root: &Path, dest_root: &Path) -> Result<Vec<ExtractionUnit>> {
    let mut staged = MemoryFS::new();
    let mut claimed: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut units = Vec::new();

    for (source, kind) in manifest.extracted_paths() {
        let relocated = manifest.destination_for(source);
        let destination = relocated
            .to_str()
            .ok_or_else(|| extraction_error(source, "destination is not valid UTF-8"))
            .and_then(|d| {
                checked_relative(d).map_err(|e| {
                    extraction_error(source, format!("invalid destination '{}': {}", d, e))
                })
            })?;

        if let Some(previous) = claimed.get(&destination) {
            return Err(extraction_error(
                source,
                format!(
                    "maps to {}, already the destination of {}",
                    destination.display(),
                    previous.display()
                ),
            ));
        }

        let file = File::read(&source_root.join(source))
            .map_err(|e| extraction_error(source, format!("cannot read: {}", e)))?;

        let existing = dest_root.join(&destination);
        if existing.exists() {
            let current = std::fs::read(&existing)
                .map_err(|e| extraction_error(&existing, format!("cannot read: {}", e)))?;
            if current != file.content {
                return Err(extraction_error(
                    source,
                    format!(
                        "destination {} already holds different content",
                        existing.display()
                    ),
                ));
            }
        }

        debug!("Extract {} -> {}", source.display(), destination.display());
        units.push(ExtractionUnit {
            source: source.to_path_buf(),
            destination: destination.clone(),
            kind,
            size: file.size() as u64,
        });
        claimed.insert(destination.clone(), source.to_path_buf());
        staged.add_file(&destination, file)?;
    }

    write::execute(&staged, dest_root)?;
    info!(
        "Extracted {} file(s) into {}",
        units.len(),
        dest_root.display()
    );

    Ok(units)
}

/// Copy the source tree into `dest_root` without the extracted subsystem.
///
/// Left out: every extracted file, everything under the subsystem root,
/// `.git`, and paths matching the manifest's `exclude` patterns.
pub fn trim(
    manifest: &Manifest,
    source_root: &Path,
    dest_root: &Path,
    units: &[ExtractionUnit],
) -> Result<TrimSummary> {
    let extracted: BTreeSet<&Path> = units.iter().map(|u| u.source.as_path()).collect();
    let mut staged = MemoryFS::new();
    let mut summary = TrimSummary::default();

    let walker = WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| {
            extraction_error(
                e.path().unwrap_or(source_root),
                format!("cannot walk source tree: {}", e),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(source_root) else {
            continue;
        };

        let in_subsystem = manifest
            .subsystem_root()
            .map(|root| rel.starts_with(root))
            .unwrap_or(false);
        if extracted.contains(rel) || in_subsystem || manifest.is_excluded(rel) {
            summary.removed.push(rel.to_path_buf());
            continue;
        }

        let file = File::read(entry.path())
            .map_err(|e| extraction_error(rel, format!("cannot read: {}", e)))?;
        staged.add_file(rel, file)?;
    }

    summary.copied = staged.len();
    write::execute(&staged, dest_root)?;
    info!(
        "Trimmed tree: {} file(s) copied, {} left out",
        summary.copied,
        summary.removed.len()
    );

    Ok(summary)
}
