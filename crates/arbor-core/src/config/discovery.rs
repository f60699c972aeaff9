//! Source root discovery

use std::path::{Path, PathBuf};

use arbor_fs::CONFIG_FILE_NAME;
use tracing::debug;

use crate::{Error, Result};

/// Find the nearest directory at or above `start` that holds `arbor.toml`.
pub fn discover_source_root(start: &Path) -> Result<PathBuf> {
    let start = arbor_fs::canonicalize_root(start)?;
    for dir in start.ancestors() {
        if dir.join(CONFIG_FILE_NAME).is_file() {
            debug!(root = %dir.display(), "discovered source root");
            return Ok(dir.to_path_buf());
        }
    }
    Err(Error::SourceRootNotFound {
        file: CONFIG_FILE_NAME,
        start,
    })
}
