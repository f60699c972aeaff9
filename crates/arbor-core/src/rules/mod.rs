//! Include/exclude rules and resolved path sets
//!
//! Resolution is a pure set computation over a [`TreeSnapshot`](crate::tree::TreeSnapshot):
//! each rule contributes its include matches (with matched directories
//! expanded to their whole subtree) minus its own exclude matches, and the
//! rule set resolves to the union of all contributions.

mod resolve;
mod rule;

pub use resolve::{MatchedPath, Resolution, RuleMatch};
pub use rule::{Rule, RuleSet};
