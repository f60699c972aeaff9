//! Resolved path sets

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::rule::Rule;
use crate::pattern::Pattern;
use crate::tree::{EntryMeta, TreeSnapshot, ancestors};

/// A relative path selected by the rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchedPath {
    pub path: String,
    pub is_dir: bool,
}

/// What a single rule contributed to a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub include: Pattern,
    pub exclude: Option<Pattern>,
    direct: usize,
    paths: Vec<MatchedPath>,
}

impl RuleMatch {
    pub(super) fn new(rule: &Rule, direct: usize, paths: Vec<String>, tree: &TreeSnapshot) -> Self {
        let paths = paths
            .into_iter()
            .map(|path| {
                let is_dir = tree.get(&path).is_some_and(EntryMeta::is_dir);
                MatchedPath { path, is_dir }
            })
            .collect();
        Self {
            include: rule.include.clone(),
            exclude: rule.exclude.clone(),
            direct,
            paths,
        }
    }

    /// Number of entries the include pattern matched by itself.
    pub fn direct(&self) -> usize {
        self.direct
    }

    /// Number of entries left after expansion and exclusion.
    pub fn contributed(&self) -> usize {
        self.paths.len()
    }

    /// Every contributed path, in path order.
    pub fn paths(&self) -> &[MatchedPath] {
        &self.paths
    }

    /// Contributed paths with no contributed ancestor.
    pub fn roots(&self) -> Vec<MatchedPath> {
        collapse(self.paths.iter().map(|m| (m.path.as_str(), m.is_dir)))
    }
}

/// The union of every rule's contribution for one target.
#[derive(Debug, Clone)]
pub struct Resolution {
    entries: BTreeMap<String, EntryMeta>,
    rules: Vec<RuleMatch>,
}

impl Resolution {
    pub(super) fn from_matches(tree: &TreeSnapshot, rules: Vec<RuleMatch>) -> Self {
        let mut entries = BTreeMap::new();
        for rule in &rules {
            for matched in &rule.paths {
                if entries.contains_key(&matched.path) {
                    continue;
                }
                if let Some(meta) = tree.get(&matched.path) {
                    entries.insert(matched.path.clone(), meta.clone());
                }
            }
        }
        Self { entries, rules }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&EntryMeta> {
        self.entries.get(path)
    }

    /// Every resolved entry in path order; parents precede children.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryMeta)> {
        self.entries.iter().map(|(path, meta)| (path.as_str(), meta))
    }

    /// The resolved set as matched paths.
    pub fn paths(&self) -> Vec<MatchedPath> {
        self.iter()
            .map(|(path, meta)| MatchedPath {
                path: path.to_string(),
                is_dir: meta.is_dir(),
            })
            .collect()
    }

    /// Resolved paths with no resolved ancestor.
    ///
    /// A directory that is matched together with some of its descendants
    /// is reported once; the descendants are covered by it.
    pub fn roots(&self) -> Vec<MatchedPath> {
        collapse(self.iter().map(|(path, meta)| (path, meta.is_dir())))
    }

    /// Per-rule contributions, in rule order.
    pub fn rule_matches(&self) -> &[RuleMatch] {
        &self.rules
    }
}

fn collapse<'a>(paths: impl Iterator<Item = (&'a str, bool)>) -> Vec<MatchedPath> {
    let paths: Vec<(&str, bool)> = paths.collect();
    let all: BTreeSet<&str> = paths.iter().map(|(path, _)| *path).collect();
    paths
        .into_iter()
        .filter(|(path, _)| !ancestors(path).any(|ancestor| all.contains(ancestor)))
        .map(|(path, is_dir)| MatchedPath {
            path: path.to_string(),
            is_dir,
        })
        .collect()
}
