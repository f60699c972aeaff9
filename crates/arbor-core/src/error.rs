//! Error types for arbor-core

use std::path::PathBuf;

use crate::pattern::PatternError;

/// Result type for arbor-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A glob was rejected when a rule was added or loaded
    Pattern,
    /// The registry references something that does not exist or is malformed
    Config,
    /// A root directory is missing or unreadable; nothing was copied
    Planning,
    /// Any other I/O failure
    Io,
}

/// Errors that can occur in arbor-core operations
///
/// Per-file copy failures and conflicts are not errors: they are recorded
/// in the [`SyncResult`](crate::SyncResult) and never abort a plan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid glob pattern
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A rule or command references a target the registry does not know
    #[error("Unknown target '{name}'")]
    UnknownTarget { name: String },

    /// Target names become table keys and display labels
    #[error("Invalid target name '{name}': {reason}")]
    InvalidTargetName { name: String, reason: String },

    /// A target's root is gone; only `init` may create it
    #[error("Root of target '{name}' does not exist: {path}")]
    TargetRootMissing { name: String, path: PathBuf },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// No ancestor of the starting directory holds a registry file
    #[error("No {file} found in {start} or any parent directory")]
    SourceRootNotFound { file: &'static str, start: PathBuf },

    /// A root directory to plan against does not exist
    #[error("Root directory does not exist: {path}")]
    RootMissing { path: PathBuf },

    /// A root path exists but is not a directory
    #[error("Root is not a directory: {path}")]
    RootNotADirectory { path: PathBuf },

    /// A root directory could not be listed
    #[error("Cannot read root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error from arbor-fs
    #[error(transparent)]
    Fs(#[from] arbor_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Pattern(_) => ErrorKind::Pattern,
            Self::UnknownTarget { .. }
            | Self::InvalidTargetName { .. }
            | Self::TargetRootMissing { .. }
            | Self::ConfigNotFound { .. }
            | Self::SourceRootNotFound { .. } => ErrorKind::Config,
            Self::RootMissing { .. } | Self::RootNotADirectory { .. } | Self::RootUnreadable { .. } => {
                ErrorKind::Planning
            }
            Self::Fs(arbor_fs::Error::ConfigParse { .. })
            | Self::Fs(arbor_fs::Error::ConfigSerialize { .. })
            | Self::Fs(arbor_fs::Error::UnsupportedFormat { .. }) => ErrorKind::Config,
            Self::Fs(_) | Self::Io(_) => ErrorKind::Io,
        }
    }
}
