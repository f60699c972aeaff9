//! Rule matching and synchronization engine for arbor
//!
//! This crate implements:
//!
//! - **Patterns**: validated globs matched segment by segment
//! - **Rules**: per-target include/exclude pairs resolved against a tree snapshot
//! - **Registry**: named targets and their rules, persisted as `arbor.toml`
//! - **Planner / Executor**: directional sync plans and their parallel execution
//!
//! # Architecture
//!
//! ```text
//!                 arbor-cli
//!                     |
//!                arbor-core
//!   pattern -> rules -> sync::Planner -> sync::Executor
//!                 ^          ^
//!               tree      config (TargetRegistry)
//!                     |
//!                 arbor-fs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use arbor_core::{Executor, Pattern, Planner, RuleSet};
//!
//! fn example() -> arbor_core::Result<()> {
//!     let mut rules = RuleSet::new("shared");
//!     rules.push(Pattern::parse("libs/auth")?, None);
//!
//!     let plan = Planner::default().plan(&rules, Path::new("/src"), Path::new("/shared"))?;
//!     let result = Executor::default().execute(&plan);
//!     assert!(result.success());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod pattern;
pub mod rules;
pub mod stats;
pub mod sync;
pub mod tree;

pub use cancel::CancelFlag;
pub use config::{
    InitOutcome, RuleConfig, Target, TargetConfig, TargetRegistry, discover_source_root,
    validate_target_name,
};
pub use error::{Error, ErrorKind, Result};
pub use pattern::{Pattern, PatternError};
pub use rules::{MatchedPath, Resolution, Rule, RuleMatch, RuleSet};
pub use stats::{ExtensionRow, FileStatistics};
pub use sync::{
    Compare, Direction, ExecuteOptions, Executor, OperationFailure, OperationKind, PlanOptions,
    PlanStats, Planner, SyncCounts, SyncOperation, SyncPlan, SyncResult,
};
pub use tree::{EntryKind, EntryMeta, TreeSnapshot};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_kinds_classify_for_exit_codes() {
        let pattern: Error = Pattern::parse("").unwrap_err().into();
        assert_eq!(pattern.kind(), ErrorKind::Pattern);

        let missing = Error::RootMissing {
            path: PathBuf::from("/nowhere"),
        };
        assert_eq!(missing.kind(), ErrorKind::Planning);
        assert!(missing.to_string().contains("/nowhere"));

        let unknown = Error::UnknownTarget {
            name: "docs".into(),
        };
        assert_eq!(unknown.kind(), ErrorKind::Config);
    }
}
