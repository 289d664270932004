//! # Split Manifest
//!
//! This module defines the manifest that drives a split: which files leave the
//! source tree, where they land in the library tree, how file content is
//! rewritten, and which templates generate the build descriptors.
//!
//! ## Key Components
//!
//! - **`ManifestDocument`**: the raw `serde` view of the file. YAML is the
//!   default; a `.json` extension selects JSON, which is also what older
//!   `split_manifest.json` files use. Unknown keys are ignored.
//!
//! - **`Manifest`**: the validated model. It is built once per run by
//!   [`Manifest::load`] and only exposes read accessors, so no stage can change
//!   it after load.
//!
//! - **`RewriteRule`**: a compiled matcher and its replacement. Applying a rule
//!   that does not match leaves the text untouched.
//!
//! ## Validation
//!
//! Loading checks the structure of the document: required keys, relative
//! paths, no path listed twice, rules with a non-empty `from` that compiles.
//! Existence of the listed files is a separate step,
//! [`Manifest::validate`], which collects every missing file instead of
//! stopping at the first one.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::descriptor::template::{DEFAULT_LIBRARY_TEMPLATE, DEFAULT_STANDALONE_TEMPLATE};
use crate::error::{Error, MissingFile, Result};
use crate::path::{checked_relative, compile_globs, regex_rename};

/// Library name used when the manifest does not set one
pub const DEFAULT_LIBRARY_NAME: &str = "scene-scroll";

////// RAW DOCUMENT //////

/// Raw manifest document as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Informational manifest version
    #[serde(default)]
    pub version: Option<String>,
    /// Identity of the extracted library
    #[serde(default)]
    pub library: LibrarySection,
    /// The files that move into the library tree
    pub scene_files: SceneFiles,
    /// Content rewrites and standalone-tree adjustments
    #[serde(default)]
    pub modifications: Modifications,
    /// Build descriptor templates
    #[serde(default)]
    pub build: BuildSection,
}

/// `library:` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrarySection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub include_subdir: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `scene_files:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFiles {
    /// Directory holding the subsystem in the source tree
    #[serde(default)]
    pub root: Option<String>,
    /// Implementation files, relative to the source root
    pub implementation: Vec<String>,
    /// Header files, relative to the source root
    #[serde(default)]
    pub headers: Vec<String>,
    /// Destination rewrites applied to extracted paths
    #[serde(default)]
    pub relocate: Vec<PathMapping>,
}

/// A regex `from` and a `$n`-expanding `to`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMapping {
    pub from: String,
    pub to: String,
}

/// One `include_patterns` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    pub from: String,
    pub to: String,
    /// Treat `from` and `to` verbatim instead of as regex and template
    #[serde(default)]
    pub literal: bool,
}

/// A stub header left at an old include path in the standalone tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectHeader {
    /// Path of the stub, relative to the standalone root
    pub path: String,
    /// Include target, e.g. `<scene-scroll/scene.h>`
    pub include: String,
}

/// `modifications:` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modifications {
    #[serde(default)]
    pub include_patterns: Vec<RuleEntry>,
    #[serde(default)]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub redirect_headers: Vec<RedirectHeader>,
}

/// `build:` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub library_template: Option<String>,
    #[serde(default)]
    pub standalone_template: Option<String>,
    #[serde(default)]
    pub dependency_variable: Option<String>,
}

////// VALIDATED MODEL //////

/// Which file set a manifest path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Implementation,
    Header,
}

/// Identity of the extracted library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySpec {
    /// Package name, also the pkg-config name (`scene-scroll`)
    pub name: String,
    /// Header install subdirectory
    pub include_subdir: String,
    /// One-line description for generated files
    pub description: String,
    /// Meson variable holding the dependency in the standalone tree
    pub dependency_variable: String,
}

/// How a rule finds text
#[derive(Debug, Clone)]
enum Matcher {
    Literal(Regex),
    Pattern(Regex),
}

/// A compiled content rewrite rule
#[derive(Debug, Clone)]
pub struct RewriteRule {
    from: String,
    to: String,
    matcher: Matcher,
}

impl RewriteRule {
    /// Compile a rule. `literal` selects exact matching.
    pub fn new(from: &str, to: &str, literal: bool) -> Result<Self> {
        if from.is_empty() {
            return Err(Error::Manifest {
                message: "rewrite rule has an empty 'from'".to_string(),
                hint: Some("Every include_patterns entry needs a non-empty 'from'".to_string()),
            });
        }

        let matcher = if literal {
            Matcher::Literal(Regex::new(&regex::escape(from))?)
        } else {
            Matcher::Pattern(Regex::new(from).map_err(|e| Error::Manifest {
                message: format!("rewrite rule '{}' is not a valid regex: {}", from, e),
                hint: Some("Set 'literal: true' to match the text exactly".to_string()),
            })?)
        };

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            matcher,
        })
    }

    /// Shorthand for an exact-text rule
    pub fn literal(from: &str, to: &str) -> Result<Self> {
        Self::new(from, to, true)
    }

    /// Shorthand for a regex rule
    pub fn pattern(from: &str, to: &str) -> Result<Self> {
        Self::new(from, to, false)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// Replace every non-overlapping match in `text`.
    ///
    /// Returns the new text and the number of matches replaced. Zero matches
    /// returns the input borrowed.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let regex = match &self.matcher {
            Matcher::Literal(r) | Matcher::Pattern(r) => r,
        };

        let count = regex.find_iter(text).count();
        if count == 0 {
            return (Cow::Borrowed(text), 0);
        }

        let replaced = match &self.matcher {
            Matcher::Literal(r) => r.replace_all(text, NoExpand(&self.to)),
            Matcher::Pattern(r) => r.replace_all(text, self.to.as_str()),
        };
        (Cow::Owned(replaced.into_owned()), count)
    }
}

/// A compiled relocation mapping
#[derive(Debug, Clone)]
pub struct Relocation {
    from: Regex,
    to: String,
}

impl Relocation {
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let from = Regex::new(from).map_err(|e| Error::Manifest {
            message: format!("relocation '{}' is not a valid regex: {}", from, e),
            hint: None,
        })?;
        Ok(Self {
            from,
            to: to.to_string(),
        })
    }
}

/// The validated, immutable split manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    schema_version: Option<String>,
    base_dir: PathBuf,
    library: LibrarySpec,
    subsystem_root: Option<PathBuf>,
    implementation_files: Vec<PathBuf>,
    header_files: Vec<PathBuf>,
    relocations: Vec<Relocation>,
    rewrite_rules: Vec<RewriteRule>,
    eligible_patterns: Vec<Pattern>,
    exclude_patterns: Vec<Pattern>,
    redirect_headers: Vec<RedirectHeader>,
    build_template_library: String,
    build_template_standalone: String,
}

/// Document syntax of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl Manifest {
    /// Load and structurally validate a manifest file.
    ///
    /// Template paths inside the manifest are resolved against the manifest's
    /// own directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Manifest {
            message: format!("cannot read manifest '{}': {}", path.display(), e),
            hint: None,
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, Format::from_path(path), base_dir)
    }

    /// Parse a manifest from text.
    pub fn parse(content: &str, format: Format, base_dir: &Path) -> Result<Self> {
        let document: ManifestDocument = match format {
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| Error::Manifest {
                message: format!("invalid manifest: {}", e),
                hint: Some("Required keys: scene_files.implementation".to_string()),
            })?,
            Format::Json => serde_json::from_str(content).map_err(|e| Error::Manifest {
                message: format!("invalid manifest: {}", e),
                hint: Some("Required keys: scene_files.implementation".to_string()),
            })?,
        };

        Self::from_document(document, base_dir)
    }

    /// Validate a raw document into a `Manifest`
    pub fn from_document(document: ManifestDocument, base_dir: &Path) -> Result<Self> {
        let implementation_files = checked_paths(&document.scene_files.implementation)?;
        let header_files = checked_paths(&document.scene_files.headers)?;

        let mut seen = BTreeSet::new();
        for path in implementation_files.iter().chain(header_files.iter()) {
            if !seen.insert(path.clone()) {
                return Err(Error::Manifest {
                    message: format!("duplicate path in scene_files: {}", path.display()),
                    hint: Some(
                        "List each file once, in either 'implementation' or 'headers'".to_string(),
                    ),
                });
            }
        }

        let subsystem_root = document
            .scene_files
            .root
            .as_deref()
            .map(checked_relative)
            .transpose()?;

        let relocations = document
            .scene_files
            .relocate
            .iter()
            .map(|m| Relocation::new(&m.from, &m.to))
            .collect::<Result<Vec<_>>>()?;

        let rewrite_rules = document
            .modifications
            .include_patterns
            .iter()
            .map(|r| RewriteRule::new(&r.from, &r.to, r.literal))
            .collect::<Result<Vec<_>>>()?;

        let eligible_patterns = compile_globs(&document.modifications.file_patterns)?;
        let exclude_patterns = compile_globs(&document.modifications.exclude)?;

        for redirect in &document.modifications.redirect_headers {
            checked_relative(&redirect.path)?;
        }

        let name = document
            .library
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_LIBRARY_NAME.to_string());
        check_tree_name(&name)?;
        let library = LibrarySpec {
            include_subdir: document
                .library
                .include_subdir
                .clone()
                .unwrap_or_else(|| name.clone()),
            description: document.library.description.clone().unwrap_or_else(|| {
                format!("{} library extracted from the Scroll window manager", name)
            }),
            dependency_variable: document
                .build
                .dependency_variable
                .clone()
                .unwrap_or_else(|| format!("{}_dep", ident(&name))),
            name,
        };

        let build_template_library = read_template(
            base_dir,
            document.build.library_template.as_deref(),
            DEFAULT_LIBRARY_TEMPLATE,
        )?;
        let build_template_standalone = read_template(
            base_dir,
            document.build.standalone_template.as_deref(),
            DEFAULT_STANDALONE_TEMPLATE,
        )?;

        Ok(Self {
            schema_version: document.version,
            base_dir: base_dir.to_path_buf(),
            library,
            subsystem_root,
            implementation_files,
            header_files,
            relocations,
            rewrite_rules,
            eligible_patterns,
            exclude_patterns,
            redirect_headers: document.modifications.redirect_headers,
            build_template_library,
            build_template_standalone,
        })
    }

    /// Check that every listed file exists under `source_root`.
    ///
    /// Returns every missing file; an empty list means the manifest is
    /// complete for this tree.
    pub fn validate(&self, source_root: &Path) -> Vec<MissingFile> {
        self.extracted_paths()
            .filter(|(path, _)| !source_root.join(path).is_file())
            .map(|(path, _)| MissingFile {
                path: path.to_path_buf(),
            })
            .collect()
    }

    /// Files under the subsystem root that the manifest does not list.
    pub fn unexpected_files(&self, source_root: &Path) -> Vec<PathBuf> {
        let Some(root) = &self.subsystem_root else {
            return Vec::new();
        };

        let listed: BTreeSet<&Path> = self.extracted_paths().map(|(p, _)| p).collect();
        WalkDir::new(source_root.join(root))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(source_root).ok().map(Path::to_path_buf))
            .filter(|p| !listed.contains(p.as_path()))
            .collect()
    }

    /// Every extracted path with its kind: implementation files first, then
    /// headers, each in manifest order.
    pub fn extracted_paths(&self) -> impl Iterator<Item = (&Path, FileKind)> {
        self.implementation_files
            .iter()
            .map(|p| (p.as_path(), FileKind::Implementation))
            .chain(
                self.header_files
                    .iter()
                    .map(|p| (p.as_path(), FileKind::Header)),
            )
    }

    /// Destination of `path` inside the library tree
    pub fn destination_for(&self, path: &Path) -> PathBuf {
        let Some(path_str) = path.to_str() else {
            return path.to_path_buf();
        };

        self.relocations
            .iter()
            .find_map(|r| regex_rename(&r.from, &r.to, path_str))
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Whether `path` (relative) is a rewrite target
    pub fn is_eligible(&self, path: &Path) -> bool {
        self.eligible_patterns.is_empty()
            || self
                .eligible_patterns
                .iter()
                .any(|p| crate::path::glob_match(p, path))
    }

    /// Whether `path` (relative) must stay out of the standalone tree
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|p| crate::path::glob_match(p, path))
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// Directory the manifest was loaded from
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn library(&self) -> &LibrarySpec {
        &self.library
    }

    pub fn subsystem_root(&self) -> Option<&Path> {
        self.subsystem_root.as_deref()
    }

    pub fn implementation_files(&self) -> &[PathBuf] {
        &self.implementation_files
    }

    pub fn header_files(&self) -> &[PathBuf] {
        &self.header_files
    }

    pub fn rewrite_rules(&self) -> &[RewriteRule] {
        &self.rewrite_rules
    }

    pub fn redirect_headers(&self) -> &[RedirectHeader] {
        &self.redirect_headers
    }

    pub fn build_template_library(&self) -> &str {
        &self.build_template_library
    }

    pub fn build_template_standalone(&self) -> &str {
        &self.build_template_standalone
    }
}

/// The library name names its output tree, so it must be one plain path
/// component.
fn check_tree_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !name.contains(['/', '\\']) {
        return Ok(());
    }
    Err(Error::Manifest {
        message: format!("library name '{}' is not a valid directory name", name),
        hint: Some("Use a single name such as 'scene-scroll', without '/' or '..'".to_string()),
    })
}

/// Meson identifier form of a package name (`scene-scroll` -> `scene_scroll`)
pub fn ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn checked_paths(raw: &[String]) -> Result<Vec<PathBuf>> {
    raw.iter().map(|p| checked_relative(p)).collect()
}

fn read_template(base_dir: &Path, path: Option<&str>, default: &str) -> Result<String> {
    match path {
        None => Ok(default.to_string()),
        Some(path) => {
            let full = base_dir.join(path);
            std::fs::read_to_string(&full).map_err(|e| Error::Manifest {
                message: format!("cannot read template '{}': {}", full.display(), e),
                hint: Some("Template paths are relative to the manifest file".to_string()),
            })
        }
    }
}
