//! Path manipulation utilities for scroll-split

use crate::error::{Error, Result};
use glob::Pattern;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Match a relative path against a glob pattern
pub fn glob_match(pattern: &Pattern, path: &Path) -> bool {
    path.to_str().map(|s| pattern.matches(s)).unwrap_or(false)
}

/// Compile a list of glob patterns, reporting the offending pattern on error
pub fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Error::Glob))
        .collect()
}

/// Apply a regex-based relocation with capture groups
///
/// The `replacement` can reference capture groups of `regex` using $1, $2, etc.
///
/// Returns the new path if the pattern matches, None if it doesn't match.
pub fn regex_rename(regex: &Regex, replacement: &str, path: &str) -> Option<String> {
    let captures = regex.captures(path)?;

    let mut result = String::new();
    let mut chars = replacement.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                chars.next(); // consume the digit
                if let Some(capture) = captures.get(digit as usize) {
                    result.push_str(capture.as_str());
                }
                continue;
            }
        }
        result.push(ch);
    }

    Some(result)
}

/// Check that a manifest path is relative and stays inside its tree.
///
/// Returns the path with `.` components removed.
pub fn checked_relative(raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(Error::manifest("empty path"));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::Manifest {
                    message: format!("path '{}' escapes the source tree", raw),
                    hint: Some("Paths must not contain '..'".to_string()),
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Manifest {
                    message: format!("path '{}' is absolute", raw),
                    hint: Some("Paths are relative to the source tree root".to_string()),
                });
            }
        }
    }

    Ok(clean)
}

/// Lexically join `entry` onto `dir`, resolving `.` and `..`.
///
/// Returns `None` if the result would climb above the tree root.
pub fn lexical_join(dir: &Path, entry: &str) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in dir.components().chain(Path::new(entry).components()) {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(parts.iter().collect())
}

/// Absolute form of `path` with symlinks resolved, for comparing trees.
///
/// The path need not exist: the longest existing ancestor is canonicalized
/// and the rest is appended after lexical `.`/`..` resolution.
pub fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Ok(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(lexical),
        }
    }
}

/// True when one path equals or contains the other
pub fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}
