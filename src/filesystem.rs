//! In-memory filesystem used to stage trees before they are written to disk
//!
//! Files are kept in a `BTreeMap` so that every listing, and therefore every
//! write and every generated source list, comes out in the same order on
//! every run.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Number of leading bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8000;

/// Represents a file with content and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Unix permission bits
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644, // Default permissions
        }
    }

    /// Read a file from disk, keeping its permission bits on Unix.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        #[allow(unused_mut)]
        let mut file = Self::new(content);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.permissions = std::fs::metadata(path)?.permissions().mode() & 0o7777;
        }

        Ok(file)
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// True when a NUL byte appears in the first 8000 bytes of `content`.
pub fn is_binary(content: &[u8]) -> bool {
    content[..content.len().min(SNIFF_LEN)].contains(&0)
}

/// Sniff `content` and return it as text when it looks like a text file.
///
/// Binary content (see [`is_binary`]) and content that is not valid UTF-8
/// both yield `None`.
pub fn as_text(content: &[u8]) -> Option<&str> {
    if is_binary(content) {
        return None;
    }
    std::str::from_utf8(content).ok()
}

/// In-memory filesystem for staging output trees
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    /// Files stored as path -> content mapping
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.files.insert(path, file);
        Ok(())
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, file) pairs, in path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }
}
