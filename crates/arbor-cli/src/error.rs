//! Error types and exit codes for arbor-cli

use arbor_core::ErrorKind;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Process exit codes. `2` belongs to clap usage errors.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// One or more operations failed
    pub const FAILURES: i32 = 1;
    /// Configuration, validation or planning error; nothing was copied
    pub const CONFIG: i32 = 3;
    /// Conflicting files were skipped
    pub const CONFLICTS: i32 = 4;
    /// The command stopped on an I/O or prompt error outside any sync
    /// operation, e.g. the registry could not be written
    pub const ABORTED: i32 = 5;
    /// Interrupted by Ctrl-C
    pub const INTERRUPTED: i32 = 130;
}

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from arbor-core
    #[error(transparent)]
    Core(#[from] arbor_core::Error),

    /// Error from arbor-fs
    #[error(transparent)]
    Fs(#[from] arbor_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(e) => match e.kind() {
                ErrorKind::Pattern | ErrorKind::Config | ErrorKind::Planning => exit::CONFIG,
                ErrorKind::Io => exit::ABORTED,
            },
            Self::Fs(arbor_fs::Error::ConfigParse { .. })
            | Self::Fs(arbor_fs::Error::ConfigSerialize { .. }) => exit::CONFIG,
            Self::User { .. } => exit::CONFIG,
            Self::Fs(_) | Self::Io(_) | Self::Dialoguer(_) => exit::ABORTED,
        }
    }
}

impl From<arbor_core::PatternError> for CliError {
    fn from(e: arbor_core::PatternError) -> Self {
        Self::Core(e.into())
    }
}
