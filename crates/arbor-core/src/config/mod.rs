//! Registry persistence and source root discovery

mod discovery;
mod registry;

pub use discovery::discover_source_root;
pub use registry::{
    InitOutcome, MAX_TARGET_NAME_LEN, RuleConfig, Target, TargetConfig, TargetRegistry,
    validate_target_name,
};
