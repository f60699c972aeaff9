//! Executor: applies a [`SyncPlan`] to the filesystem
//!
//! Runs in three phases:
//!
//! 1. directory creations, sequentially in plan order
//! 2. file copies, in parallel on a bounded worker pool
//! 3. deletions, sequentially in plan order
//!
//! Every directory exists before any file beneath it is written. Each copy
//! lands through a temporary sibling and an atomic rename, so a destination
//! file is never observed half-written.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use arbor_fs::{NormalizedPath, RobustnessConfig, io};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::plan::{OperationKind, SyncOperation, SyncPlan};
use super::result::{OperationFailure, SyncCounts, SyncResult};
use crate::cancel::CancelFlag;
use crate::tree::ancestors;

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Report what would happen; perform no I/O
    pub dry_run: bool,
    /// Upper bound on concurrent file copies
    pub jobs: usize,
    pub cancel: CancelFlag,
    pub robustness: RobustnessConfig,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: num_cpus::get(),
            cancel: CancelFlag::new(),
            robustness: RobustnessConfig::default(),
        }
    }
}

/// Shared state for one run.
#[derive(Default)]
struct Progress {
    files_copied: AtomicUsize,
    dirs_created: AtomicUsize,
    files_deleted: AtomicUsize,
    bytes_copied: AtomicU64,
    not_started: AtomicUsize,
    failures: Mutex<Vec<OperationFailure>>,
}

impl Progress {
    fn fail(&self, path: &str, cause: impl ToString) {
        let cause = cause.to_string();
        warn!(path, %cause, "operation failed");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(OperationFailure {
                path: path.to_string(),
                cause,
            });
    }
}

/// Applies plans.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    options: ExecuteOptions,
}

impl Executor {
    pub fn new(options: ExecuteOptions) -> Self {
        Self { options }
    }

    /// Execute `plan`. Never fails as a whole: per-operation failures are
    /// collected into the result and the remaining operations still run.
    #[instrument(skip_all, fields(target = %plan.target, dry_run = self.options.dry_run))]
    pub fn execute(&self, plan: &SyncPlan) -> SyncResult {
        let conflicts: Vec<String> = plan.conflicts().map(|op| op.path.clone()).collect();
        for path in &conflicts {
            warn!(path, "destination differs, skipped (use --replace-existing to overwrite)");
        }

        let planned_failures: Vec<OperationFailure> = plan
            .operations
            .iter()
            .filter_map(|op| match &op.kind {
                OperationKind::Fail { cause } => Some(OperationFailure {
                    path: op.path.clone(),
                    cause: cause.clone(),
                }),
                _ => None,
            })
            .collect();

        if self.options.dry_run {
            return SyncResult {
                target: plan.target.clone(),
                direction: plan.direction,
                dry_run: true,
                counts: SyncCounts::projected(&plan.stats),
                conflicts,
                failures: planned_failures,
                cancelled: false,
                not_started: 0,
            };
        }

        let progress = Progress {
            failures: Mutex::new(planned_failures),
            ..Progress::default()
        };

        let (dirs, rest): (Vec<&SyncOperation>, Vec<&SyncOperation>) = plan
            .operations
            .iter()
            .filter(|op| matches!(op.kind, OperationKind::Copy | OperationKind::Delete))
            .partition(|op| op.is_copy() && op.is_dir);
        let (files, deletions): (Vec<&SyncOperation>, Vec<&SyncOperation>) =
            rest.into_iter().partition(|op| op.is_copy());

        for op in dirs {
            if self.skip_if_cancelled(&progress) {
                continue;
            }
            self.create_dir(plan, op, &progress);
        }

        let files: Vec<&SyncOperation> = files
            .into_iter()
            .filter(|op| self.clear_blocked_parents(plan, op, &progress))
            .collect();
        self.copy_files(plan, &files, &progress);

        for op in deletions {
            if self.skip_if_cancelled(&progress) {
                continue;
            }
            self.delete(plan, op, &progress);
        }

        let mut failures = progress
            .failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        let not_started = progress.not_started.into_inner();
        let result = SyncResult {
            target: plan.target.clone(),
            direction: plan.direction,
            dry_run: false,
            counts: SyncCounts {
                files_copied: progress.files_copied.into_inner(),
                dirs_created: progress.dirs_created.into_inner(),
                files_deleted: progress.files_deleted.into_inner(),
                files_unchanged: plan.stats.files_unchanged,
                conflicts: plan.stats.conflicts,
                bytes_copied: progress.bytes_copied.into_inner(),
            },
            conflicts,
            failures,
            cancelled: not_started > 0,
            not_started,
        };

        info!(
            copied = result.counts.files_copied,
            dirs = result.counts.dirs_created,
            deleted = result.counts.files_deleted,
            failures = result.failures.len(),
            cancelled = result.cancelled,
            "sync finished"
        );
        result
    }

    fn skip_if_cancelled(&self, progress: &Progress) -> bool {
        if self.options.cancel.is_cancelled() {
            progress.not_started.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    fn create_dir(&self, plan: &SyncPlan, op: &SyncOperation, progress: &Progress) {
        let destination = NormalizedPath::new(&op.path).under(&plan.to_root);

        // Only planned when replacing: a file sits where the directory goes.
        if fs::symlink_metadata(&destination).is_ok_and(|m| !m.is_dir())
            && let Err(e) = io::remove_path(&destination)
        {
            progress.fail(&op.path, e);
            return;
        }

        match fs::create_dir_all(&destination) {
            Ok(()) => {
                debug!(path = %op.path, "created directory");
                progress.dirs_created.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => progress.fail(&op.path, e),
        }
    }

    /// Remove files standing where a copy needs a parent directory. Only
    /// planned when replacing. Runs before the parallel phase so that two
    /// copies never race on the same ancestor.
    fn clear_blocked_parents(&self, plan: &SyncPlan, op: &SyncOperation, progress: &Progress) -> bool {
        if self.options.cancel.is_cancelled() {
            return true;
        }
        let parents: Vec<&str> = ancestors(&op.path).collect();
        for parent in parents.into_iter().rev() {
            let destination = NormalizedPath::new(parent).under(&plan.to_root);
            match fs::metadata(&destination) {
                Ok(metadata) if metadata.is_dir() => continue,
                Ok(_) => {
                    if let Err(e) = io::remove_path(&destination) {
                        progress.fail(&op.path, e);
                        return false;
                    }
                    debug!(path = parent, "removed file blocking a directory");
                    return true;
                }
                Err(_) => return true,
            }
        }
        true
    }

    fn copy_files(&self, plan: &SyncPlan, files: &[&SyncOperation], progress: &Progress) {
        let run = |op: &&SyncOperation| {
            if self.skip_if_cancelled(progress) {
                return;
            }
            let source = NormalizedPath::new(&op.path).under(&plan.from_root);
            let destination = NormalizedPath::new(&op.path).under(&plan.to_root);
            match self.copy_file(&source, &destination) {
                Ok(bytes) => {
                    debug!(path = %op.path, bytes, "copied");
                    progress.files_copied.fetch_add(1, Ordering::Relaxed);
                    progress.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
                }
                Err(e) => progress.fail(&op.path, e),
            }
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| files.par_iter().for_each(run)),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable, copying sequentially");
                files.iter().for_each(run);
            }
        }
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> arbor_fs::Result<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| arbor_fs::Error::io(parent, e))?;
        }
        // Only planned when replacing: a directory sits where the file goes.
        if fs::symlink_metadata(destination).is_ok_and(|m| m.is_dir()) {
            io::remove_path(destination)?;
        }
        io::copy_atomic(source, destination, self.options.robustness)
    }

    fn delete(&self, plan: &SyncPlan, op: &SyncOperation, progress: &Progress) {
        let destination = NormalizedPath::new(&op.path).under(&plan.to_root);
        match io::remove_path(&destination) {
            Ok(()) => {
                debug!(path = %op.path, "deleted");
                progress.files_deleted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => progress.fail(&op.path, e),
        }
    }
}
