//! Writing staged trees to disk
//!
//! Both the library tree and the standalone tree are staged in a `MemoryFS`
//! and written here, in path order.
//!
//! ## Process
//!
//! 1.  **Create Directories**: parent directories are created recursively.
//!
//! 2.  **Write Content**: a file whose on-disk bytes already match is left
//!     alone, so a rerun into the same workspace touches nothing.
//!
//! 3.  **Set Permissions**: on Unix-like systems, permissions are set to the
//!     stored bits (e.g. the executable bit of configure scripts).

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;

/// Write every file of `staged` under `output_path`.
///
/// Returns the number of files whose content was actually written.
pub fn execute(staged: &MemoryFS, output_path: &Path) -> Result<usize> {
    let mut written = 0;

    for (relative_path, file) in staged.files() {
        let full_path = output_path.join(relative_path);
        let fail = |action: &str, e: std::io::Error| Error::Extraction {
            path: full_path.clone(),
            message: format!("failed to {}: {}", action, e),
        };

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| fail("create directory", e))?;
        }

        let unchanged = fs::read(&full_path)
            .map(|existing| existing == file.content)
            .unwrap_or(false);
        if unchanged {
            debug!("Unchanged {}", full_path.display());
        } else {
            fs::write(&full_path, &file.content).map_err(|e| fail("write", e))?;
            written += 1;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(file.permissions);
            fs::set_permissions(&full_path, perms).map_err(|e| fail("set permissions", e))?;
        }
    }

    Ok(written)
}
