//! Filesystem layer for arbor
//!
//! Provides forward-slash path normalization, crash-safe writes and copies
//! (temp file + atomic rename), content checksums and format-agnostic
//! configuration storage. Everything above this crate treats a destination
//! file as either fully written or untouched.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::{CONFIG_FILE_NAME, TEMP_FILE_SUFFIX};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, canonicalize_root};
