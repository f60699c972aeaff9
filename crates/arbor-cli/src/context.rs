//! Source root detection
//!
//! Commands work from anywhere below the source root, the way git commands
//! work from anywhere inside a repository.

use std::path::{Path, PathBuf};

use arbor_core::discover_source_root;
use arbor_fs::canonicalize_root;

use crate::error::{CliError, Result};

/// Source root for commands that read an existing registry.
///
/// An explicit `--source` wins; otherwise the nearest ancestor of `cwd`
/// holding `arbor.toml` is used.
pub fn source_root(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => existing_dir(&absolute(path, cwd)),
        None => Ok(discover_source_root(cwd)?),
    }
}

/// Source root for `init`: the explicit `--source` or the working directory.
pub fn init_source_root(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    existing_dir(&absolute(explicit.unwrap_or(cwd), cwd))
}

/// Resolve `path` against `cwd` when relative.
pub fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(CliError::user(format!(
            "Source directory does not exist: {}",
            path.display()
        )));
    }
    Ok(canonicalize_root(path)?)
}
