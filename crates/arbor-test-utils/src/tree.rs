//! [`TestTree`] builder for arbor test scenarios.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use arbor_fs::TEMP_FILE_SUFFIX;
use filetime::FileTime;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary directory tree with helper methods for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use arbor_test_utils::TestTree;
///
/// let source = TestTree::new()
///     .file("libs/auth/a.py", "print('a')")
///     .dir("libs/empty");
/// source.assert_file_exists("libs/auth/a.py");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root().to_path_buf(), |acc, seg| acc.join(seg))
    }

    /// Add a file, creating parent directories.
    pub fn file(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    /// Add an empty directory.
    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.path(relative)).unwrap();
        self
    }

    /// Add a symlink at `link` pointing to `target` (relative to the link's directory).
    pub fn symlink(self, target: &str, link: &str) -> Self {
        let link_path = self.path(link);
        if let Some(parent) = link_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &link_path).unwrap();
        #[cfg(windows)]
        std::os::windows::fs::symlink_file(target, &link_path).unwrap();
        self
    }

    /// Write (or overwrite) a file in place.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Set a file's modification time, in seconds since the epoch.
    pub fn set_mtime(&self, relative: &str, seconds: i64) {
        filetime::set_file_mtime(self.path(relative), FileTime::from_unix_time(seconds, 0)).unwrap();
    }

    /// A file's modification time, in whole seconds since the epoch.
    pub fn mtime(&self, relative: &str) -> i64 {
        let metadata = fs::metadata(self.path(relative)).unwrap();
        FileTime::from_last_modification_time(&metadata).unix_seconds()
    }

    /// Read a file's content.
    pub fn read(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// True if the tree holds no entries at all.
    pub fn is_empty(&self) -> bool {
        fs::read_dir(self.root()).unwrap().next().is_none()
    }

    /// Every entry as a relative forward-slash path, sorted.
    pub fn entries(&self) -> Vec<String> {
        self.fingerprint().into_keys().collect()
    }

    /// Relative path to (size, mtime in nanoseconds) for every entry.
    ///
    /// Two equal fingerprints mean nothing in the tree was written.
    pub fn fingerprint(&self) -> BTreeMap<String, (u64, i128)> {
        WalkDir::new(self.root())
            .min_depth(1)
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                let relative = entry
                    .path()
                    .strip_prefix(self.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                let metadata = entry.metadata().unwrap();
                let mtime = FileTime::from_last_modification_time(&metadata);
                let nanos = i128::from(mtime.unix_seconds()) * 1_000_000_000
                    + i128::from(mtime.nanoseconds());
                let size = if metadata.is_dir() { 0 } else { metadata.len() };
                (relative, (size, nanos))
            })
            .collect()
    }

    /// Leftover temporary files from atomic writes.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        WalkDir::new(self.root())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(TEMP_FILE_SUFFIX))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Assert that `relative` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `relative` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `relative` has exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_file_content(&self, relative: &str, content: &str) {
        let actual = self.read(relative);
        assert_eq!(
            actual,
            content,
            "File {} has unexpected content",
            self.path(relative).display()
        );
    }
}
