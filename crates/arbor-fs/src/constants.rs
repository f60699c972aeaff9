//! Well-known file names.

/// Name of the registry file stored at the source root.
pub const CONFIG_FILE_NAME: &str = "arbor.toml";

/// Suffix of in-flight temporary files created by atomic writes and copies.
pub const TEMP_FILE_SUFFIX: &str = ".arbor-tmp";

/// Returns true if `name` is a temporary file left by an atomic write.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_FILE_SUFFIX)
}
