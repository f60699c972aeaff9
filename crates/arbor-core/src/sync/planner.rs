//! Planner: turns a rule set and two trees into a [`SyncPlan`]
//!
//! Planning only reads and stats. It is safe to call repeatedly and is what
//! a dry run reports.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use arbor_fs::NormalizedPath;
use arbor_fs::checksum::files_identical;
use tracing::{debug, info, instrument};

use super::plan::{Compare, Direction, OperationKind, PlanStats, SyncOperation, SyncPlan};
use crate::pattern::Pattern;
use crate::rules::{Resolution, RuleSet};
use crate::stats::FileStatistics;
use crate::tree::{EntryKind, EntryMeta, TreeSnapshot, ancestors};
use crate::{Error, Result};

/// Options for planning
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub direction: Direction,
    /// Overwrite differing files and mirror matched directories
    pub replace_existing: bool,
    pub compare: Compare,
    /// Keep only entries this pattern matches, directly or via an ancestor
    pub filter: Option<Pattern>,
}

/// Computes sync plans.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlanOptions,
}

impl Planner {
    pub fn new(options: PlanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Plan a sync of `rules` between `source_root` and `target_root`.
    ///
    /// Forward resolves against the source and writes to the target;
    /// reverse resolves the same patterns against the target and writes to
    /// the source.
    ///
    /// # Errors
    ///
    /// Fails before producing any operation if either root is missing, is
    /// not a directory, or cannot be listed.
    #[instrument(skip_all, fields(target = %rules.target(), direction = %self.options.direction))]
    pub fn plan(&self, rules: &RuleSet, source_root: &Path, target_root: &Path) -> Result<SyncPlan> {
        let (from_root, to_root) = match self.options.direction {
            Direction::Forward => (source_root, target_root),
            Direction::Reverse => (target_root, source_root),
        };
        check_root(to_root)?;

        let snapshot = TreeSnapshot::capture_excluding(from_root, &nested(from_root, to_root))?;
        let resolution = rules.resolve(&snapshot);

        let mut operations = Vec::new();
        let mut selected = Vec::new();
        // A conflicted directory stands for its whole subtree.
        let mut conflicted: BTreeSet<&str> = BTreeSet::new();
        for (path, meta) in resolution.iter() {
            if !self.keeps(path) {
                continue;
            }
            selected.push((path, meta));
            if ancestors(path).any(|ancestor| conflicted.contains(ancestor)) {
                continue;
            }
            if let Some(kind) = self.decide(path, meta, from_root, to_root) {
                debug!(path, ?kind, "planned");
                if kind == OperationKind::SkipConflict && meta.is_dir() {
                    conflicted.insert(path);
                }
                operations.push(self.operation(path, meta, kind));
            }
        }

        if self.options.replace_existing {
            operations.extend(self.deletions(rules, &resolution, from_root, to_root)?);
        }

        let mut stats = PlanStats::default();
        for operation in &operations {
            stats.record(operation);
        }

        info!(
            files = stats.files_to_copy,
            dirs = stats.dirs_to_create,
            unchanged = stats.files_unchanged,
            conflicts = stats.conflicts,
            deletions = stats.deletions,
            failures = stats.planned_failures,
            "plan ready"
        );

        Ok(SyncPlan {
            target: rules.target().to_string(),
            direction: self.options.direction,
            from_root: from_root.to_path_buf(),
            to_root: to_root.to_path_buf(),
            operations,
            stats,
            statistics: FileStatistics::from_entries(selected),
            rule_matches: resolution.rule_matches().to_vec(),
        })
    }

    fn keeps(&self, path: &str) -> bool {
        self.options
            .filter
            .as_ref()
            .is_none_or(|filter| filter.matches_self_or_ancestor(path))
    }

    fn operation(&self, path: &str, meta: &EntryMeta, kind: OperationKind) -> SyncOperation {
        let size = match (&kind, &meta.kind) {
            (OperationKind::Copy, EntryKind::File) => meta.size,
            _ => 0,
        };
        SyncOperation {
            path: path.to_string(),
            is_dir: meta.is_dir(),
            kind,
            direction: self.options.direction,
            size,
        }
    }

    /// Decide what to do with one resolved entry. `None` means nothing to do.
    fn decide(&self, path: &str, meta: &EntryMeta, from_root: &Path, to_root: &Path) -> Option<OperationKind> {
        if let EntryKind::Broken { cause } = &meta.kind {
            return Some(OperationKind::Fail {
                cause: cause.clone(),
            });
        }

        let relative = NormalizedPath::new(path);
        let destination = relative.under(to_root);
        let replace_or_conflict = || {
            if self.options.replace_existing {
                OperationKind::Copy
            } else {
                OperationKind::SkipConflict
            }
        };

        let existing = match fs::metadata(&destination) {
            Ok(existing) => existing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Some(OperationKind::Copy),
            // A destination ancestor is a file.
            Err(e) if e.kind() == ErrorKind::NotADirectory => return Some(replace_or_conflict()),
            Err(e) => {
                return Some(OperationKind::Fail {
                    cause: e.to_string(),
                });
            }
        };

        if meta.is_dir() {
            return if existing.is_dir() {
                None
            } else {
                Some(replace_or_conflict())
            };
        }
        if existing.is_dir() {
            return Some(replace_or_conflict());
        }

        let same_size = existing.len() == meta.size;
        let identical = match self.options.compare {
            Compare::SizeAndMtime => same_size && existing.modified().ok() == meta.modified,
            Compare::Checksum => {
                if !same_size {
                    false
                } else {
                    match files_identical(&relative.under(from_root), &destination) {
                        Ok(identical) => identical,
                        Err(e) => {
                            return Some(OperationKind::Fail {
                                cause: e.to_string(),
                            });
                        }
                    }
                }
            }
        };

        if identical {
            Some(OperationKind::SkipUnchanged)
        } else {
            Some(replace_or_conflict())
        }
    }

    /// Destination entries beneath a selected directory that the rules
    /// would select there but that the resolution side no longer has.
    ///
    /// Only the topmost such entry is deleted; removal is recursive.
    fn deletions(
        &self,
        rules: &RuleSet,
        resolution: &Resolution,
        from_root: &Path,
        to_root: &Path,
    ) -> Result<Vec<SyncOperation>> {
        let destination = TreeSnapshot::capture_excluding(to_root, &nested(to_root, from_root))?;
        let mirrored = rules.resolve(&destination);

        let mut stale: Vec<(&str, &EntryMeta)> = Vec::new();
        let mut stale_paths: BTreeSet<&str> = BTreeSet::new();
        for (path, meta) in mirrored.iter() {
            if resolution.contains(path) || !self.keeps(path) {
                continue;
            }
            let under_selected_dir = ancestors(path)
                .any(|ancestor| resolution.get(ancestor).is_some_and(EntryMeta::is_dir));
            let covered = ancestors(path).any(|ancestor| stale_paths.contains(ancestor));
            if under_selected_dir && !covered {
                stale_paths.insert(path);
                stale.push((path, meta));
            }
        }

        Ok(stale
            .into_iter()
            .rev()
            .map(|(path, meta)| self.operation(path, meta, OperationKind::Delete))
            .collect())
    }
}

fn check_root(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(Error::RootNotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::RootMissing {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(Error::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        }),
    }
}

/// `inner` as a subtree to skip when it lies strictly inside `outer`.
fn nested(outer: &Path, inner: &Path) -> Vec<PathBuf> {
    if inner != outer && inner.starts_with(outer) {
        vec![inner.to_path_buf()]
    } else {
        Vec::new()
    }
}
