//! Rule and RuleSet types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::resolve::{Resolution, RuleMatch};
use crate::pattern::Pattern;
use crate::tree::TreeSnapshot;

/// One include pattern, optionally narrowed by an exclude pattern.
///
/// The exclude only ever removes paths from this rule's own include set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub include: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,
    pub target: String,
}

impl Rule {
    pub fn new(include: Pattern, exclude: Option<Pattern>, target: impl Into<String>) -> Self {
        Self {
            include,
            exclude,
            target: target.into(),
        }
    }

    /// Compute this rule's contribution against `tree`.
    ///
    /// Runs in two explicit phases: direct matches are collected first,
    /// then every matched directory is expanded to its subtree. Excludes are
    /// applied the same way, so excluding a directory drops its subtree.
    pub fn contribution(&self, tree: &TreeSnapshot) -> RuleMatch {
        let direct: Vec<&str> = tree
            .iter()
            .filter(|(path, _)| self.include.matches(path))
            .map(|(path, _)| path)
            .collect();

        let mut included: BTreeSet<&str> = BTreeSet::new();
        for path in &direct {
            if !included.insert(*path) {
                continue;
            }
            if tree.get(path).is_some_and(|meta| meta.is_dir()) {
                included.extend(tree.descendants(path).map(|(p, _)| p));
            }
        }

        if let Some(exclude) = &self.exclude {
            let excluded_roots: Vec<&str> = included
                .iter()
                .copied()
                .filter(|path| exclude.matches(path))
                .collect();
            for path in excluded_roots {
                included.remove(path);
                if tree.get(path).is_some_and(|meta| meta.is_dir()) {
                    for (below, _) in tree.descendants(path) {
                        included.remove(below);
                    }
                }
            }
        }

        debug!(
            include = %self.include,
            direct = direct.len(),
            contributed = included.len(),
            "resolved rule"
        );

        RuleMatch::new(
            self,
            direct.len(),
            included.into_iter().map(str::to_string).collect(),
            tree,
        )
    }
}

/// The ordered rules of a single target.
///
/// Order matters only for display; resolution is a set union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    target: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            rules: Vec::new(),
        }
    }

    /// Build a rule set from include/exclude pairs.
    pub fn from_patterns<I>(target: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = (Pattern, Option<Pattern>)>,
    {
        let target = target.into();
        let rules = patterns
            .into_iter()
            .map(|(include, exclude)| Rule::new(include, exclude, target.clone()))
            .collect();
        Self { target, rules }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn push(&mut self, include: Pattern, exclude: Option<Pattern>) {
        self.rules
            .push(Rule::new(include, exclude, self.target.clone()));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve every rule against `tree` and union the contributions.
    #[instrument(skip_all, fields(target = %self.target, rules = self.rules.len()))]
    pub fn resolve(&self, tree: &TreeSnapshot) -> Resolution {
        let matches: Vec<RuleMatch> = self
            .rules
            .iter()
            .map(|rule| rule.contribution(tree))
            .collect();

        for rule_match in matches.iter().filter(|m| m.contributed() == 0) {
            warn!(
                target = %self.target,
                include = %rule_match.include,
                "rule matches no paths"
            );
        }

        Resolution::from_matches(tree, matches)
    }
}
