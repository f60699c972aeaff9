//! Execution results

use serde::Serialize;

use super::plan::{Direction, PlanStats};

/// Counts of operations actually performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub files_copied: usize,
    pub dirs_created: usize,
    pub files_deleted: usize,
    pub files_unchanged: usize,
    pub conflicts: usize,
    pub bytes_copied: u64,
}

impl SyncCounts {
    /// What a plan projects, as if every operation succeeded.
    pub fn projected(stats: &PlanStats) -> Self {
        Self {
            files_copied: stats.files_to_copy,
            dirs_created: stats.dirs_to_create,
            files_deleted: stats.deletions,
            files_unchanged: stats.files_unchanged,
            conflicts: stats.conflicts,
            bytes_copied: stats.bytes_total,
        }
    }

    pub fn files_skipped(&self) -> usize {
        self.files_unchanged + self.conflicts
    }

    pub fn add(&mut self, other: &Self) {
        self.files_copied += other.files_copied;
        self.dirs_created += other.dirs_created;
        self.files_deleted += other.files_deleted;
        self.files_unchanged += other.files_unchanged;
        self.conflicts += other.conflicts;
        self.bytes_copied += other.bytes_copied;
    }
}

/// A single operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub path: String,
    pub cause: String,
}

/// Outcome of executing one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub target: String,
    pub direction: Direction,
    pub dry_run: bool,
    pub counts: SyncCounts,
    /// Paths left alone because the destination differs
    pub conflicts: Vec<String>,
    /// Failures sorted by path
    pub failures: Vec<OperationFailure>,
    /// Set when cancellation stopped dispatch before the plan finished
    pub cancelled: bool,
    /// Operations never started because of cancellation
    pub not_started: usize,
}

impl SyncResult {
    /// No failures and not cancelled. Conflicts do not count against success.
    pub fn success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}
