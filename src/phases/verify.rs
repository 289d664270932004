//! Build verification of an output tree
//!
//! The tree is copied into a throwaway sandbox and built there with a
//! configure step followed by a compile step. The verifier never raises:
//! anything that goes wrong, including failing to start the build tool,
//! comes back as `BuildResult { success: false, .. }` with the reason in the
//! log.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::process::{Outcome, ProcessBuilder};

/// Default time allowed for configure and compile together
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Build commands and limits for [`verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Whole-build time limit
    pub timeout: Duration,
    /// Configure command, run in the sandboxed tree
    pub configure: Vec<String>,
    /// Compile command, run after a successful configure
    pub compile: Vec<String>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            configure: vec!["meson".into(), "setup".into(), "build".into()],
            compile: vec!["ninja".into(), "-C".into(), "build".into()],
        }
    }
}

impl VerifyOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of building one tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub success: bool,
    /// Combined stdout and stderr of every step, in order
    pub log: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl BuildResult {
    /// The last `lines` lines of the log
    pub fn log_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.log.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

fn failed(log: String, start: Instant) -> BuildResult {
    BuildResult {
        success: false,
        log,
        timed_out: false,
        duration: start.elapsed(),
    }
}

/// Configure and compile `tree_root` in a sandbox.
pub fn verify(tree_root: &Path, options: &VerifyOptions) -> BuildResult {
    let start = Instant::now();
    info!("Verifying build of {}", tree_root.display());

    let sandbox = match tempfile::Builder::new()
        .prefix("scroll-split-verify-")
        .tempdir()
    {
        Ok(dir) => dir,
        Err(e) => return failed(format!("cannot create sandbox: {}\n", e), start),
    };
    let work = sandbox.path().join("tree");
    if let Err(message) = copy_tree(tree_root, &work) {
        return failed(format!("cannot copy tree into sandbox: {}\n", message), start);
    }

    let log_path = sandbox.path().join("build.log");
    let mut log = match fs::File::create(&log_path) {
        Ok(file) => file,
        Err(e) => return failed(format!("cannot create build log: {}\n", e), start),
    };

    let mut success = true;
    let mut timed_out = false;
    for argv in [&options.configure, &options.compile] {
        let Some(step) = ProcessBuilder::from_argv(argv) else {
            continue;
        };
        let step = step.cwd(&work);
        let _ = writeln!(log, "$ {}", step.display_command());

        let remaining = options.timeout.saturating_sub(start.elapsed());
        let outcome = if remaining.is_zero() {
            Ok(Outcome::TimedOut)
        } else {
            step.run_logged(&log, remaining)
        };

        match outcome {
            Ok(Outcome::Exited(status)) if status.success() => {
                debug!("`{}` succeeded", step.display_command());
            }
            Ok(Outcome::Exited(status)) => {
                let _ = writeln!(log, "`{}` failed: {}", step.display_command(), status);
                success = false;
                break;
            }
            Ok(Outcome::TimedOut) => {
                let _ = writeln!(
                    log,
                    "build timed out after {}s during `{}`",
                    options.timeout.as_secs_f64(),
                    step.display_command()
                );
                success = false;
                timed_out = true;
                break;
            }
            Err(e) => {
                let _ = writeln!(log, "{}", e);
                success = false;
                break;
            }
        }
    }
    drop(log);

    let log = fs::read(&log_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_else(|e| format!("cannot read build log: {}\n", e));

    let result = BuildResult {
        success,
        log,
        timed_out,
        duration: start.elapsed(),
    };
    if result.success {
        info!(
            "Build of {} passed in {:.1}s",
            tree_root.display(),
            result.duration.as_secs_f64()
        );
    } else {
        warn!("Build of {} failed", tree_root.display());
    }
    result
}

/// Verify the library and standalone trees concurrently.
pub fn verify_pair(
    library: &Path,
    standalone: &Path,
    options: &VerifyOptions,
) -> (BuildResult, BuildResult) {
    rayon::join(|| verify(library, options), || verify(standalone, options))
}

/// Copy `from` to `to`, skipping `.git` and keeping permission bits.
fn copy_tree(from: &Path, to: &Path) -> Result<(), String> {
    let walker = WalkDir::new(from)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| e.to_string())?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| e.to_string())?;
        let target = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| format!("{}: {}", target.display(), e))?;
        } else if entry.file_type().is_file() {
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target)
                .map_err(|e| format!("{}: {}", entry.path().display(), e))?;
        }
    }

    if !to.exists() {
        return Err(format!("{} is not a directory", from.display()));
    }
    Ok(())
}
