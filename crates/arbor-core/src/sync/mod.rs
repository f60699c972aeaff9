//! Planning and executing syncs
//!
//! The [`Planner`] turns a [`RuleSet`](crate::rules::RuleSet) plus the two
//! roots into a [`SyncPlan`]; the [`Executor`] applies it and reports a
//! [`SyncResult`]. A dry run is a plan executed with `dry_run` set.

mod executor;
mod plan;
mod planner;
mod result;

pub use executor::{ExecuteOptions, Executor};
pub use plan::{Compare, Direction, OperationKind, PlanStats, SyncOperation, SyncPlan};
pub use planner::{PlanOptions, Planner};
pub use result::{OperationFailure, SyncCounts, SyncResult};
