//! File statistics by extension

use std::collections::BTreeMap;

use serde::Serialize;

use crate::rules::Resolution;
use crate::tree::EntryMeta;

/// Label used for files without an extension.
pub const NO_EXTENSION: &str = "(no extension)";

/// Counts of resolved files and directories, with files grouped by extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStatistics {
    pub total_files: usize,
    pub total_dirs: usize,
    pub by_extension: BTreeMap<String, usize>,
}

/// One row of the extension breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionRow {
    pub extension: String,
    pub count: usize,
    pub percentage: f64,
}

impl FileStatistics {
    /// Tally every resolved entry. Broken entries are counted as files.
    pub fn from_resolution(resolution: &Resolution) -> Self {
        Self::from_entries(resolution.iter())
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a EntryMeta)>) -> Self {
        let mut stats = Self::default();
        for (path, meta) in entries {
            if meta.is_dir() {
                stats.total_dirs += 1;
            } else {
                stats.total_files += 1;
                *stats.by_extension.entry(extension_label(path)).or_default() += 1;
            }
        }
        stats
    }

    /// Merge another target's statistics into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total_files += other.total_files;
        self.total_dirs += other.total_dirs;
        for (extension, count) in &other.by_extension {
            *self.by_extension.entry(extension.clone()).or_default() += count;
        }
    }

    /// Extension rows, most frequent first; ties sort by extension.
    pub fn rows(&self) -> Vec<ExtensionRow> {
        let mut rows: Vec<ExtensionRow> = self
            .by_extension
            .iter()
            .map(|(extension, &count)| ExtensionRow {
                extension: extension.clone(),
                count,
                percentage: if self.total_files == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / self.total_files as f64
                },
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
        rows
    }
}

/// Lowercased extension with its leading dot, or [`NO_EXTENSION`].
pub fn extension_label(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        // ".bashrc" has no extension
        Some(idx) if idx > 0 && idx + 1 < name.len() => name[idx..].to_lowercase(),
        _ => NO_EXTENSION.to_string(),
    }
}
