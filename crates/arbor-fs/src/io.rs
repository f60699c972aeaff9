//! Atomic I/O operations
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so a destination file is either the old content or the new content, never
//! a truncated mix.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use filetime::FileTime;
use fs2::FileExt;
use tracing::{debug, warn};

use crate::constants::TEMP_FILE_SUFFIX;
use crate::{Error, NormalizedPath, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Retry policy for the final rename of an atomic write.
///
/// Some platforms (notably Windows with antivirus or indexers holding
/// handles) report transient `PermissionDenied` on rename.
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// Retry transient rename failures at all
    pub retry_rename: bool,
    /// First delay between attempts
    pub initial_interval: Duration,
    /// Give up after this much time spent retrying
    pub max_elapsed: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            retry_rename: true,
            initial_interval: Duration::from_millis(10),
            max_elapsed: Duration::from_millis(500),
        }
    }
}

impl RobustnessConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            retry_rename: false,
            ..Self::default()
        }
    }
}

/// Temporary sibling path for `target`, unique per process and call.
fn temp_sibling(target: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.{}{}",
        target
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
        TEMP_FILE_SUFFIX
    );
    target.with_file_name(temp_name)
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::PermissionDenied | ErrorKind::Interrupted | ErrorKind::WouldBlock
    )
}

fn rename_into_place(temp: &Path, target: &Path, robustness: RobustnessConfig) -> Result<()> {
    let outcome = if robustness.retry_rename {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(robustness.initial_interval)
            .with_max_elapsed_time(Some(robustness.max_elapsed))
            .build();
        backoff::retry(policy, || {
            fs::rename(temp, target).map_err(|e| {
                if is_transient(&e) {
                    debug!(path = %target.display(), error = %e, "rename failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    } else {
        fs::rename(temp, target)
    };

    outcome.map_err(|e| {
        if let Err(cleanup) = fs::remove_file(temp) {
            warn!(path = %temp.display(), error = %cleanup, "failed to remove temporary file");
        }
        Error::io(target, e)
    })
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock on the temporary file while writing.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(&native_path);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;
    drop(temp_file);

    rename_into_place(&temp_path, &native_path, robustness)
}

/// Copy `src` to `dst` atomically, preserving the modification time.
///
/// Permissions follow `std::fs::copy`. Missing parent directories of `dst`
/// are NOT created here; callers decide the directory creation order.
/// Returns the number of bytes copied.
pub fn copy_atomic(src: &Path, dst: &Path, robustness: RobustnessConfig) -> Result<u64> {
    let metadata = fs::metadata(src).map_err(|e| Error::io(src, e))?;
    let temp_path = temp_sibling(dst);

    let bytes = match fs::copy(src, &temp_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::io(src, e));
        }
    };

    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    if let Err(e) = filetime::set_file_times(&temp_path, atime, mtime) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(dst, e));
    }

    rename_into_place(&temp_path, dst, robustness)?;
    Ok(bytes)
}

/// Remove a file or a whole directory tree.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    let outcome = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    outcome.map_err(|e| Error::io(path, e))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}
