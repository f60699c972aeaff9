//! Command implementations for arbor-cli

pub mod apply;
pub mod config;
pub mod init;
pub mod rule;

pub use apply::run_apply;
pub use config::run_print_config;
pub use init::{is_interactive, run_init};
pub use rule::{run_add_rule, run_list_rules, run_remove_rule};
