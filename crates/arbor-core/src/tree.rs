//! Filesystem snapshots that rules are resolved against
//!
//! A snapshot is a sorted map from forward-slash relative paths to entry
//! metadata. Sorting gives parent-before-child order for free: a directory
//! path is a strict prefix of every path beneath it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use arbor_fs::constants::is_temp_file_name;
use arbor_fs::{CONFIG_FILE_NAME, NormalizedPath};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// What a snapshot entry turned out to be after following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// A dangling symlink, a symlink loop, or an entry that could not be read
    Broken { cause: String },
}

/// Metadata recorded for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    /// File size in bytes; zero for directories and broken entries
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl EntryMeta {
    pub fn file(size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            modified,
        }
    }

    pub fn dir() -> Self {
        Self {
            kind: EntryKind::Dir,
            size: 0,
            modified: None,
        }
    }

    pub fn broken(cause: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Broken {
                cause: cause.into(),
            },
            size: 0,
            modified: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.kind, EntryKind::Broken { .. })
    }

    fn from_metadata(metadata: &fs::Metadata) -> Self {
        if metadata.is_dir() {
            Self::dir()
        } else {
            Self::file(metadata.len(), metadata.modified().ok())
        }
    }
}

/// An immutable listing of every entry below a root.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    root: PathBuf,
    entries: BTreeMap<String, EntryMeta>,
}

impl TreeSnapshot {
    /// Walk `root` and record every entry beneath it.
    ///
    /// Symlinks are followed. The registry file at the top level and
    /// in-flight temporary files are never part of a snapshot.
    pub fn capture(root: &Path) -> Result<Self> {
        Self::capture_excluding(root, &[])
    }

    /// Like [`capture`](Self::capture), but skips the given subtrees.
    ///
    /// Used when a target root lives inside the source root, so the
    /// target's own contents are not synced into itself.
    pub fn capture_excluding(root: &Path, excluded: &[PathBuf]) -> Result<Self> {
        let metadata = fs::metadata(root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::RootMissing {
                path: root.to_path_buf(),
            },
            _ => Error::RootUnreadable {
                path: root.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_dir() {
            return Err(Error::RootNotADirectory {
                path: root.to_path_buf(),
            });
        }
        fs::read_dir(root).map_err(|e| Error::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut entries = BTreeMap::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_ignored(entry, excluded));

        for item in walker {
            match item {
                Ok(entry) => {
                    let Some(relative) = NormalizedPath::relative(root, entry.path()) else {
                        continue;
                    };
                    let meta = match entry.metadata() {
                        Ok(metadata) => EntryMeta::from_metadata(&metadata),
                        Err(e) => EntryMeta::broken(e.to_string()),
                    };
                    entries.insert(relative.as_str().to_string(), meta);
                }
                Err(e) => {
                    let Some(path) = e.path() else {
                        warn!(error = %e, "walk error without a path");
                        continue;
                    };
                    let Some(relative) = NormalizedPath::relative(root, path) else {
                        continue;
                    };
                    let cause = if e.loop_ancestor().is_some() {
                        "symlink loop".to_string()
                    } else if fs::symlink_metadata(path).is_ok() && fs::metadata(path).is_err() {
                        "dangling symlink".to_string()
                    } else {
                        e.io_error()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| e.to_string())
                    };
                    debug!(path = %relative, %cause, "recording broken entry");
                    entries.insert(relative.as_str().to_string(), EntryMeta::broken(cause));
                }
            }
        }

        debug!(root = %root.display(), entries = entries.len(), "captured tree snapshot");
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Build a snapshot from explicit entries, without touching the disk.
    pub fn from_entries<I, S>(root: impl Into<PathBuf>, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, EntryMeta)>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            entries: entries
                .into_iter()
                .map(|(path, meta)| (NormalizedPath::new(path.into()).as_str().to_string(), meta))
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&EntryMeta> {
        self.entries.get(path)
    }

    /// All entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryMeta)> {
        self.entries.iter().map(|(path, meta)| (path.as_str(), meta))
    }

    /// Every entry strictly beneath `dir`, in path order.
    pub fn descendants<'a>(
        &'a self,
        dir: &str,
    ) -> impl Iterator<Item = (&'a str, &'a EntryMeta)> + use<'a> {
        let start = format!("{dir}/");
        // '0' is the character right after '/'
        let end = format!("{dir}0");
        self.entries
            .range(start..end)
            .map(|(path, meta)| (path.as_str(), meta))
    }
}

fn is_ignored(entry: &walkdir::DirEntry, excluded: &[PathBuf]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() == 1 && name == CONFIG_FILE_NAME {
        return true;
    }
    if is_temp_file_name(&name) {
        return true;
    }
    excluded.iter().any(|skip| entry.path() == skip)
}

/// True if `path` lies strictly beneath `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Every proper ancestor of `path`, nearest first.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = path;
    std::iter::from_fn(move || {
        let (parent, _) = current.rsplit_once('/')?;
        current = parent;
        Some(parent)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_test_utils::TestTree;
    use pretty_assertions::assert_eq;

    fn paths(snapshot: &TreeSnapshot) -> Vec<&str> {
        snapshot.iter().map(|(path, _)| path).collect()
    }

    #[test]
    fn capture_lists_entries_in_parent_first_order() {
        let tree = TestTree::new()
            .file("libs/auth/a.py", "a")
            .file("libs/other/b.py", "bb")
            .file("libs-extra.txt", "x");

        let snapshot = TreeSnapshot::capture(tree.root()).unwrap();

        assert_eq!(
            paths(&snapshot),
            vec![
                "libs",
                "libs-extra.txt",
                "libs/auth",
                "libs/auth/a.py",
                "libs/other",
                "libs/other/b.py",
            ]
        );
        assert_eq!(snapshot.get("libs/other/b.py").unwrap().size, 2);
        assert!(snapshot.get("libs").unwrap().is_dir());
    }

    #[test]
    fn registry_file_and_temp_files_are_skipped() {
        let tree = TestTree::new()
            .file(CONFIG_FILE_NAME, "[targets]")
            .file("nested/arbor.toml", "kept")
            .file(".a.py.1.0.arbor-tmp", "partial");

        let snapshot = TreeSnapshot::capture(tree.root()).unwrap();

        assert_eq!(paths(&snapshot), vec!["nested", "nested/arbor.toml"]);
    }

    #[test]
    fn excluded_subtrees_are_skipped() {
        let tree = TestTree::new().file("src/a.txt", "a").file("out/b.txt", "b");

        let snapshot =
            TreeSnapshot::capture_excluding(tree.root(), &[tree.path("out")]).unwrap();

        assert_eq!(paths(&snapshot), vec!["src", "src/a.txt"]);
    }

    #[test]
    fn missing_root_is_a_planning_error() {
        let tree = TestTree::new();
        let err = TreeSnapshot::capture(&tree.path("nope")).unwrap_err();
        assert!(matches!(err, Error::RootMissing { .. }));
    }

    #[test]
    fn file_root_is_rejected() {
        let tree = TestTree::new().file("plain.txt", "x");
        let err = TreeSnapshot::capture(&tree.path("plain.txt")).unwrap_err();
        assert!(matches!(err, Error::RootNotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_broken() {
        let tree = TestTree::new()
            .file("ok.txt", "fine")
            .symlink("missing-target", "dangling");

        let snapshot = TreeSnapshot::capture(tree.root()).unwrap();

        let entry = snapshot.get("dangling").unwrap();
        assert!(entry.is_broken(), "got {entry:?}");
        assert!(!snapshot.get("ok.txt").unwrap().is_broken());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_directory_is_followed() {
        let tree = TestTree::new()
            .file("real/inner.txt", "x")
            .symlink("real", "alias");

        let snapshot = TreeSnapshot::capture(tree.root()).unwrap();

        assert!(snapshot.get("alias").unwrap().is_dir());
        assert!(snapshot.get("alias/inner.txt").is_some());
    }

    #[test]
    fn descendants_range_excludes_siblings() {
        let snapshot = TreeSnapshot::from_entries(
            "/virtual",
            [
                ("a", EntryMeta::dir()),
                ("a-b", EntryMeta::file(1, None)),
                ("a/x", EntryMeta::file(1, None)),
                ("a/y", EntryMeta::dir()),
                ("a/y/z", EntryMeta::file(1, None)),
                ("ab", EntryMeta::file(1, None)),
            ],
        );

        let below: Vec<&str> = snapshot.descendants("a").map(|(p, _)| p).collect();
        assert_eq!(below, vec!["a/x", "a/y", "a/y/z"]);
    }

    #[test]
    fn descendant_and_ancestor_helpers() {
        assert!(is_descendant("a/b", "a"));
        assert!(!is_descendant("a", "a"));
        assert!(!is_descendant("ab", "a"));
        assert_eq!(ancestors("a/b/c").collect::<Vec<_>>(), vec!["a/b", "a"]);
        assert_eq!(ancestors("a").count(), 0);
    }
}
