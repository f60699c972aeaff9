//! Plan types produced by the planner

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::rules::RuleMatch;
use crate::stats::FileStatistics;

/// Which way files flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Source tree to target tree
    #[default]
    Forward,
    /// Target tree back to source tree
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// How an existing destination file is judged identical to its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compare {
    /// Same size and same modification time
    #[default]
    SizeAndMtime,
    /// Same size and same SHA-256 digest
    Checksum,
}

/// What to do with one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    /// Create the directory, or copy the file over whatever is there
    Copy,
    SkipUnchanged,
    /// Destination differs; left alone without replace-existing
    SkipConflict,
    /// Destination entry no longer selected (replace-existing only)
    Delete,
    /// Known to fail at planning time; recorded without I/O
    Fail { cause: String },
}

/// A single planned operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOperation {
    /// Relative forward-slash path, the same on both sides
    pub path: String,
    pub is_dir: bool,
    #[serde(flatten)]
    pub kind: OperationKind,
    pub direction: Direction,
    /// Bytes to copy; zero unless a file copy
    pub size: u64,
}

impl SyncOperation {
    pub fn is_copy(&self) -> bool {
        self.kind == OperationKind::Copy
    }
}

/// Projected counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    pub files_to_copy: usize,
    pub dirs_to_create: usize,
    pub files_unchanged: usize,
    pub conflicts: usize,
    pub deletions: usize,
    pub planned_failures: usize,
    pub bytes_total: u64,
}

impl PlanStats {
    pub(crate) fn record(&mut self, operation: &SyncOperation) {
        match (&operation.kind, operation.is_dir) {
            (OperationKind::Copy, true) => self.dirs_to_create += 1,
            (OperationKind::Copy, false) => {
                self.files_to_copy += 1;
                self.bytes_total += operation.size;
            }
            (OperationKind::SkipUnchanged, _) => self.files_unchanged += 1,
            (OperationKind::SkipConflict, _) => self.conflicts += 1,
            (OperationKind::Delete, _) => self.deletions += 1,
            (OperationKind::Fail { .. }, _) => self.planned_failures += 1,
        }
    }

    /// Entries that will not be written: unchanged plus conflicts.
    pub fn files_skipped(&self) -> usize {
        self.files_unchanged + self.conflicts
    }

    /// Operations that would touch the destination.
    pub fn pending(&self) -> usize {
        self.files_to_copy + self.dirs_to_create + self.deletions
    }
}

/// An ordered list of operations for one target and direction.
///
/// Directory creations precede everything beneath them; deletions come
/// last, deepest first.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub target: String,
    pub direction: Direction,
    /// Root the rules were resolved against
    pub from_root: PathBuf,
    /// Root written to
    pub to_root: PathBuf,
    pub operations: Vec<SyncOperation>,
    pub stats: PlanStats,
    /// Per-rule contributions, for zero-match diagnostics
    pub rule_matches: Vec<RuleMatch>,
    /// Extension breakdown of the selected entries
    pub statistics: FileStatistics,
}

impl SyncPlan {
    /// True if executing would change nothing.
    pub fn is_noop(&self) -> bool {
        self.stats.pending() == 0
    }

    /// Paths skipped because the destination differs.
    pub fn conflicts(&self) -> impl Iterator<Item = &SyncOperation> {
        self.operations
            .iter()
            .filter(|op| op.kind == OperationKind::SkipConflict)
    }

    /// File copies, in plan order.
    pub fn file_copies(&self) -> impl Iterator<Item = &SyncOperation> {
        self.operations
            .iter()
            .filter(|op| op.is_copy() && !op.is_dir)
    }
}
