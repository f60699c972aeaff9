//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// arbor - Share parts of a directory tree with other directories
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Source root (defaults to the nearest directory holding arbor.toml)
    #[arg(short, long, global = true, env = "ARBOR_SOURCE")]
    pub source: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Register a target directory
    ///
    /// Writes arbor.toml in the source root (the current directory unless
    /// --source is given) and creates the target directory if needed.
    ///
    /// Examples:
    ///   arbor init -t ../shared
    ///   arbor init -t ../shared -n shared
    Init {
        /// Target directory
        #[arg(short, long)]
        target: PathBuf,

        /// Target name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Add an include rule to a target
    ///
    /// Examples:
    ///   arbor add-rule -p libs/auth -t shared
    ///   arbor add-rule -p "libs/*" -e "libs/*/tests/**" -t shared
    AddRule {
        /// Include glob, relative to the source root
        #[arg(short, long)]
        pattern: String,

        /// Target name
        #[arg(short, long)]
        target: String,

        /// Exclude glob applied to this rule only
        #[arg(short, long)]
        exclude: Option<String>,
    },

    /// Remove every rule with the given include pattern
    RemoveRule {
        /// Include glob to remove
        #[arg(short, long)]
        pattern: String,

        /// Target name
        #[arg(short, long)]
        target: String,
    },

    /// Show rules and what they currently match
    ListRules {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Synchronize matched paths to targets
    ///
    /// Examples:
    ///   arbor apply --dry
    ///   arbor apply -t shared --replace-existing
    ///   arbor apply -t shared --reverse -f "libs/auth/**"
    Apply(ApplyArgs),

    /// Print the registered targets and rules
    PrintConfig {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Table)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments of `arbor apply`
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct ApplyArgs {
    /// Only sync this target (default: all targets)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Only sync paths matching this glob (or below a matching directory)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Show what would happen without touching the filesystem
    #[arg(short, long)]
    pub dry: bool,

    /// Copy from the target back into the source
    #[arg(short, long)]
    pub reverse: bool,

    /// Overwrite differing files and delete stale entries under matched directories
    #[arg(long)]
    pub replace_existing: bool,

    /// Only print statistics and the preview
    #[arg(long)]
    pub stats_only: bool,

    /// Compare file contents instead of size and modification time
    #[arg(long)]
    pub checksum: bool,

    /// Number of parallel copy workers (default: available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Number of files shown in the preview (0 disables it)
    #[arg(short, long, default_value_t = 100)]
    pub limit: usize,

    /// Do not ask for confirmation on large syncs
    #[arg(short, long)]
    pub yes: bool,

    /// Output as JSON for scripting
    #[arg(long)]
    pub json: bool,
}

/// Output formats for `print-config`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Table,
    Json,
}
