//! # Build Descriptor Synthesis
//!
//! Generates the `meson.build` of the library tree from a template, and
//! rewrites the `meson.build` files of the trimmed standalone tree so that it
//! consumes the library as an external dependency.
//!
//! Nothing here compiles anything. The output is text, checked only for
//! bracket and string balance.

pub mod meson;
pub mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::manifest::{ident, FileKind, Manifest};
use crate::phases::extract::ExtractionUnit;

/// Name of the build descriptor in every directory
pub const DESCRIPTOR_FILE: &str = "meson.build";

/// Which output tree a descriptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Library,
    Standalone,
}

/// Generated build input for one output tree
#[derive(Debug, Clone, Serialize)]
pub struct BuildDescriptor {
    pub kind: TreeKind,
    pub version: String,
    /// Compiled sources, relative to the tree root
    pub sources: Vec<PathBuf>,
    /// Headers, relative to the tree root
    pub headers: Vec<PathBuf>,
    /// External dependency names, in declaration order
    pub dependencies: Vec<String>,
    /// Things worth telling the user that did not stop synthesis
    pub notes: Vec<String>,
    /// Rendered files, relative path to content
    #[serde(skip)]
    pub files: BTreeMap<PathBuf, String>,
}

impl BuildDescriptor {
    /// Write every rendered file under `root`, creating directories.
    pub fn write_to(&self, root: &Path) -> Result<()> {
        for (rel, content) in &self.files {
            let target = root.join(rel);
            let io_err = |e: std::io::Error| Error::BuildDescriptor {
                path: rel.clone(),
                message: e.to_string(),
            };
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            std::fs::write(&target, content).map_err(io_err)?;
            debug!("Wrote {}", target.display());
        }
        Ok(())
    }

    /// Content of the root descriptor, if rendered
    pub fn root_file(&self) -> Option<&str> {
        self.files.get(Path::new(DESCRIPTOR_FILE)).map(String::as_str)
    }
}

/// Quote a path as one Meson list entry line
fn list_entry(path: &Path) -> String {
    format!("  '{}',", meson_string(&path.to_string_lossy()))
}

/// Escape `text` for use inside a single-quoted Meson string
fn meson_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn descriptor_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Error {
    Error::BuildDescriptor {
        path: path.into(),
        message: message.into(),
    }
}

/// Render the library tree's descriptor and README.
///
/// Sources and headers are the extraction units' destinations, in unit order.
pub fn synthesize_library(
    manifest: &Manifest,
    units: &[ExtractionUnit],
    version: &semver::Version,
) -> Result<BuildDescriptor> {
    let library = manifest.library();

    let sources: Vec<PathBuf> = units
        .iter()
        .filter(|u| u.kind == FileKind::Implementation)
        .map(|u| u.destination.clone())
        .collect();
    let headers: Vec<PathBuf> = units
        .iter()
        .filter(|u| u.kind == FileKind::Header)
        .map(|u| u.destination.clone())
        .collect();

    let mut vars = BTreeMap::new();
    vars.insert("name", library.name.clone());
    vars.insert("ident", ident(&library.name));
    vars.insert("version", version.to_string());
    vars.insert("description", library.description.clone());
    vars.insert("include_subdir", library.include_subdir.clone());
    vars.insert(
        "sources",
        sources.iter().map(|p| list_entry(p)).collect::<Vec<_>>().join("\n"),
    );
    vars.insert(
        "headers",
        headers.iter().map(|p| list_entry(p)).collect::<Vec<_>>().join("\n"),
    );

    let mut quoted = vars.clone();
    for key in ["name", "description", "include_subdir"] {
        if let Some(value) = quoted.get_mut(key) {
            *value = meson_string(value);
        }
    }
    let rendered = template::render(
        manifest.build_template_library(),
        &quoted,
        &["version", "sources"],
    )
    .map_err(|message| descriptor_error(DESCRIPTOR_FILE, message))?;

    let dependencies = meson::dependency_names(&rendered)
        .map_err(|message| descriptor_error(DESCRIPTOR_FILE, format!("rendered template: {}", message)))?;

    let readme = template::render(template::LIBRARY_README_TEMPLATE, &vars, &[])
        .map_err(|message| descriptor_error("README.md", message))?;

    let mut files = BTreeMap::new();
    files.insert(PathBuf::from(DESCRIPTOR_FILE), rendered);
    files.insert(PathBuf::from("README.md"), readme);

    info!(
        "Synthesized library descriptor: {} sources, {} headers",
        sources.len(),
        headers.len()
    );

    Ok(BuildDescriptor {
        kind: TreeKind::Library,
        version: version.to_string(),
        sources,
        headers,
        dependencies,
        notes: Vec::new(),
        files,
    })
}

/// The external dependency that replaces the extracted subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDependency {
    /// pkg-config name
    pub name: String,
    /// Meson variable the standalone tree uses for it
    pub variable: String,
    pub version_requirement: String,
    /// Template for the declaration line
    pub declaration_template: String,
}

impl LibraryDependency {
    /// Dependency on the library at `version` or newer
    pub fn from_manifest(manifest: &Manifest, version: &semver::Version) -> Self {
        let library = manifest.library();
        Self {
            name: library.name.clone(),
            variable: library.dependency_variable.clone(),
            version_requirement: format!(">={}", version),
            declaration_template: manifest.build_template_standalone().to_string(),
        }
    }

    /// Render the declaration line
    pub fn declaration(&self) -> std::result::Result<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("variable", self.variable.clone());
        vars.insert("name", meson_string(&self.name));
        vars.insert("version_requirement", meson_string(&self.version_requirement));
        template::render(&self.declaration_template, &vars, &["name"])
            .map(|s| s.trim_end().to_string())
    }
}

/// The `meson.build` files of a standalone tree
#[derive(Debug, Clone)]
pub struct OriginalDescriptor {
    files: BTreeMap<PathBuf, String>,
    /// Files that lost source entries
    touched: BTreeSet<PathBuf>,
    removed_sources: Vec<PathBuf>,
    removed_subdirs: Vec<PathBuf>,
}

impl OriginalDescriptor {
    /// Read every `meson.build` under `tree_root`.
    ///
    /// The root file is required and every file must pass the syntax check.
    pub fn load(tree_root: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();

        let walker = WalkDir::new(tree_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(|e| {
                descriptor_error(
                    e.path().map(Path::to_path_buf).unwrap_or_default(),
                    e.to_string(),
                )
            })?;
            if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(tree_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            let content = std::fs::read_to_string(entry.path())
                .map_err(|e| descriptor_error(rel.clone(), e.to_string()))?;
            files.insert(rel, content);
        }

        Self::from_files(files)
    }

    /// Build from already-read descriptor files keyed by relative path
    pub fn from_files(files: BTreeMap<PathBuf, String>) -> Result<Self> {
        let root = files
            .get(Path::new(DESCRIPTOR_FILE))
            .ok_or_else(|| descriptor_error(DESCRIPTOR_FILE, "no root meson.build"))?;

        for (path, content) in &files {
            meson::scan(content).map_err(|message| descriptor_error(path.clone(), message))?;
        }

        let (name, version) =
            meson::project_info(root).map_err(|message| descriptor_error(DESCRIPTOR_FILE, message))?;
        if name.is_none() {
            return Err(descriptor_error(DESCRIPTOR_FILE, "no project() call"));
        }
        debug!(
            "Loaded {} descriptor(s), project version {}",
            files.len(),
            version.as_deref().unwrap_or("unset")
        );

        Ok(Self {
            files,
            touched: BTreeSet::new(),
            removed_sources: Vec::new(),
            removed_subdirs: Vec::new(),
        })
    }

    /// Remove every source entry that resolves to an extracted file, and
    /// every `subdir()` call into a directory with no descriptor left.
    pub fn without_sources(mut self, units: &[ExtractionUnit]) -> Result<Self> {
        let extracted: BTreeSet<PathBuf> = units.iter().map(|u| u.source.clone()).collect();
        let present_dirs: BTreeSet<PathBuf> = self
            .files
            .keys()
            .map(|p| p.parent().map(Path::to_path_buf).unwrap_or_default())
            .collect();

        let mut updated = BTreeMap::new();
        for (path, content) in &self.files {
            let dir = path.parent().unwrap_or_else(|| Path::new(""));

            let (content, removed) = meson::remove_sources(content, dir, &extracted)
                .map_err(|message| descriptor_error(path.clone(), message))?;
            let (content, dropped) =
                meson::remove_subdir_calls(&content, dir, |d| present_dirs.contains(d))
                    .map_err(|message| descriptor_error(path.clone(), message))?;

            if !removed.is_empty() {
                debug!("Removed {} source entries from {}", removed.len(), path.display());
                self.touched.insert(path.clone());
            }
            self.removed_sources.extend(removed);
            self.removed_subdirs.extend(dropped);
            updated.insert(path.clone(), content);
        }
        self.files = updated;

        Ok(self)
    }

    /// Descriptor files keyed by relative path
    pub fn files(&self) -> &BTreeMap<PathBuf, String> {
        &self.files
    }

    /// Source entries removed by [`without_sources`](Self::without_sources)
    pub fn removed_sources(&self) -> &[PathBuf] {
        &self.removed_sources
    }

    /// Directories whose `subdir()` calls were dropped
    pub fn removed_subdirs(&self) -> &[PathBuf] {
        &self.removed_subdirs
    }

    /// Files that referenced extracted sources
    pub fn touched(&self) -> impl Iterator<Item = &Path> {
        self.touched.iter().map(PathBuf::as_path)
    }

    /// Source and header entries still listed, in file order
    pub fn remaining_entries(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for (path, content) in &self.files {
            let dir = path.parent().unwrap_or_else(|| Path::new(""));
            entries.extend(
                meson::source_entries(content, dir)
                    .map_err(|message| descriptor_error(path.clone(), message))?,
            );
        }
        Ok(entries)
    }
}

fn is_header(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("h") | Some("hpp")
    )
}

/// Rewrite the standalone tree's descriptors to consume the library.
pub fn synthesize_standalone(
    original: &OriginalDescriptor,
    version: &semver::Version,
    dependency: &LibraryDependency,
) -> Result<BuildDescriptor> {
    let declaration = dependency
        .declaration()
        .map_err(|message| descriptor_error(DESCRIPTOR_FILE, message))?;

    let mut files = original.files().clone();
    let mut notes = Vec::new();

    let root = files
        .get(Path::new(DESCRIPTOR_FILE))
        .ok_or_else(|| descriptor_error(DESCRIPTOR_FILE, "no root meson.build"))?;
    let root = meson::set_project_version(root, &version.to_string())
        .map_err(|message| descriptor_error(DESCRIPTOR_FILE, message))?;
    let (root, declared) =
        meson::insert_declaration(&root, &dependency.variable, &dependency.name, &declaration)
            .map_err(|message| descriptor_error(DESCRIPTOR_FILE, message))?;
    match declared {
        meson::Declaration::AlreadyPresent => notes.push(format!(
            "dependency('{}') already declared; declaration not inserted",
            dependency.name
        )),
        meson::Declaration::Replaced => notes.push(format!(
            "replaced existing assignment to {}",
            dependency.variable
        )),
        meson::Declaration::Inserted => {}
    }
    files.insert(PathBuf::from(DESCRIPTOR_FILE), root);

    for path in original.touched() {
        let Some(content) = files.get(path) else {
            continue;
        };
        let (content, changed) = meson::add_to_dependency_lists(content, &dependency.variable)
            .map_err(|message| descriptor_error(path, message))?;
        if changed > 0 {
            debug!(
                "Added {} to {} dependency list(s) in {}",
                dependency.variable,
                changed,
                path.display()
            );
        }
        files.insert(path.to_path_buf(), content);
    }

    for dir in original.removed_subdirs() {
        notes.push(format!("dropped subdir('{}')", dir.display()));
    }

    let mut dependencies: Vec<String> = Vec::new();
    for (path, content) in &files {
        for name in meson::dependency_names(content)
            .map_err(|message| descriptor_error(path.clone(), message))?
        {
            if !dependencies.contains(&name) {
                dependencies.push(name);
            }
        }
    }

    let (headers, sources): (Vec<PathBuf>, Vec<PathBuf>) = original
        .remaining_entries()?
        .into_iter()
        .partition(|p| is_header(p));

    info!(
        "Synthesized standalone descriptor: {} sources remain, {} entries removed",
        sources.len(),
        original.removed_sources().len()
    );

    Ok(BuildDescriptor {
        kind: TreeKind::Standalone,
        version: version.to_string(),
        sources,
        headers,
        dependencies,
        notes,
        files,
    })
}
