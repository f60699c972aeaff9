//! Target registry
//!
//! The registry is the single source of truth for targets and their rules.
//! It persists to `arbor.toml` at the source root:
//!
//! ```toml
//! [targets.shared]
//! root = "/abs/shared"
//!
//! [[targets.shared.rules]]
//! include = "libs/auth"
//! exclude = "libs/auth/tests/**"
//! ```
//!
//! Patterns are validated when the file is parsed, so a registry that loads
//! never carries an invalid glob.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arbor_fs::{CONFIG_FILE_NAME, ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pattern::Pattern;
use crate::rules::RuleSet;
use crate::{Error, Result};

/// Longest accepted target name.
pub const MAX_TARGET_NAME_LEN: usize = 64;

/// A rule as persisted, without its target (the enclosing table names it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub include: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,
}

/// A target as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub root: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

/// A named destination tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub root: PathBuf,
}

impl Target {
    /// The target root as an absolute path.
    ///
    /// Roots are stored absolute; a hand-edited relative root is taken
    /// relative to the source root.
    pub fn resolved_root(&self, source_root: &Path) -> PathBuf {
        if self.root.is_absolute() {
            self.root.clone()
        } else {
            source_root.join(&self.root)
        }
    }

    /// The canonical target root, which must already exist.
    pub fn existing_root(&self, source_root: &Path) -> Result<PathBuf> {
        let root = self.resolved_root(source_root);
        if !root.is_dir() {
            return Err(Error::TargetRootMissing {
                name: self.name.clone(),
                path: root,
            });
        }
        Ok(arbor_fs::canonicalize_root(&root)?)
    }
}

/// Outcome of [`TargetRegistry::init_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    /// The target existed with a different root; its rules were kept
    Updated,
    Unchanged,
}

/// In-memory view of `arbor.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRegistry {
    #[serde(default)]
    targets: BTreeMap<String, TargetConfig>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the registry file for a source root.
    pub fn config_path(source_root: &Path) -> PathBuf {
        source_root.join(CONFIG_FILE_NAME)
    }

    /// Load the registry stored at `source_root`.
    pub fn load(source_root: &Path) -> Result<Self> {
        let path = Self::config_path(source_root);
        if !path.is_file() {
            return Err(Error::ConfigNotFound { path });
        }
        let registry: Self = ConfigStore::new().load(&NormalizedPath::new(&path))?;
        registry.validate()?;
        debug!(path = %path.display(), targets = registry.targets.len(), "loaded registry");
        Ok(registry)
    }

    /// Load the registry, or start an empty one if none exists yet.
    pub fn load_or_default(source_root: &Path) -> Result<Self> {
        if Self::config_path(source_root).is_file() {
            Self::load(source_root)
        } else {
            Ok(Self::new())
        }
    }

    /// Parse registry text, validating patterns and target names.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let registry: Self = ConfigStore::new().parse(&NormalizedPath::new(CONFIG_FILE_NAME), content)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Render the registry as it would be saved.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(ConfigStore::new().render(&NormalizedPath::new(CONFIG_FILE_NAME), self)?)
    }

    /// Atomically write the registry to `source_root`.
    pub fn save(&self, source_root: &Path) -> Result<()> {
        let path = Self::config_path(source_root);
        ConfigStore::new().save(&NormalizedPath::new(&path), self)?;
        info!(path = %path.display(), "saved registry");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.targets.keys().try_for_each(|name| validate_target_name(name))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Create a target or point an existing one at a new root.
    pub fn init_target(&mut self, name: &str, root: PathBuf) -> Result<InitOutcome> {
        validate_target_name(name)?;
        match self.targets.get_mut(name) {
            Some(existing) if existing.root == root => Ok(InitOutcome::Unchanged),
            Some(existing) => {
                existing.root = root;
                Ok(InitOutcome::Updated)
            }
            None => {
                self.targets.insert(
                    name.to_string(),
                    TargetConfig {
                        root,
                        rules: Vec::new(),
                    },
                );
                Ok(InitOutcome::Created)
            }
        }
    }

    /// Append a rule. Returns `false` if an identical rule already exists.
    pub fn add_rule(&mut self, target: &str, include: Pattern, exclude: Option<Pattern>) -> Result<bool> {
        let config = self.config_mut(target)?;
        let rule = RuleConfig { include, exclude };
        if config.rules.contains(&rule) {
            return Ok(false);
        }
        config.rules.push(rule);
        Ok(true)
    }

    /// Remove every rule of `target` whose include pattern equals `include`.
    ///
    /// Returns how many rules were removed.
    pub fn remove_rule(&mut self, target: &str, include: &Pattern) -> Result<usize> {
        let config = self.config_mut(target)?;
        let before = config.rules.len();
        config.rules.retain(|rule| &rule.include != include);
        Ok(before - config.rules.len())
    }

    pub fn target(&self, name: &str) -> Result<Target> {
        self.targets
            .get_key_value(name)
            .map(|(name, config)| Target {
                name: name.clone(),
                root: config.root.clone(),
            })
            .ok_or_else(|| Error::UnknownTarget {
                name: name.to_string(),
            })
    }

    /// All targets, ordered by name.
    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|(name, config)| Target {
                name: name.clone(),
                root: config.root.clone(),
            })
            .collect()
    }

    /// Either the named target or every target.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<Target>> {
        match name {
            Some(name) => Ok(vec![self.target(name)?]),
            None => Ok(self.targets()),
        }
    }

    /// Persisted rules of a target, in insertion order.
    pub fn rules(&self, target: &str) -> Result<&[RuleConfig]> {
        self.targets
            .get(target)
            .map(|config| config.rules.as_slice())
            .ok_or_else(|| Error::UnknownTarget {
                name: target.to_string(),
            })
    }

    /// The rules of a target, bound to it for resolution.
    pub fn rule_set(&self, target: &str) -> Result<RuleSet> {
        let rules = self.rules(target)?;
        Ok(RuleSet::from_patterns(
            target,
            rules
                .iter()
                .map(|rule| (rule.include.clone(), rule.exclude.clone())),
        ))
    }

    fn config_mut(&mut self, target: &str) -> Result<&mut TargetConfig> {
        self.targets
            .get_mut(target)
            .ok_or_else(|| Error::UnknownTarget {
                name: target.to_string(),
            })
    }
}

/// Check that `name` can be used as a target name.
pub fn validate_target_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidTargetName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.chars().count() > MAX_TARGET_NAME_LEN {
        return Err(invalid("name is longer than 64 characters"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(&format!("character '{bad}' is not allowed")));
    }
    Ok(())
}
