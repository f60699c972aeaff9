//! Rule management command implementations
//!
//! Commands for adding, removing and listing the rules of a target.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::json;

use arbor_core::{Pattern, RuleMatch, TargetRegistry, TreeSnapshot};

use crate::error::Result;

/// Add an include rule (with an optional exclude) to a target.
pub fn run_add_rule(source: &Path, target: &str, pattern: &str, exclude: Option<&str>) -> Result<()> {
    let include = Pattern::parse(pattern)?;
    let exclude = exclude.map(Pattern::parse).transpose()?;

    let mut registry = TargetRegistry::load(source)?;
    let added = registry.add_rule(target, include.clone(), exclude.clone())?;

    if !added {
        println!(
            "{} Rule '{}' already exists for target '{}'",
            "OK".green().bold(),
            include.as_str().cyan(),
            target
        );
        return Ok(());
    }
    registry.save(source)?;

    match exclude {
        Some(exclude) => println!(
            "{} Added rule '{}' (excluding '{}') to target '{}'",
            "OK".green().bold(),
            include.as_str().cyan(),
            exclude.as_str().yellow(),
            target
        ),
        None => println!(
            "{} Added rule '{}' to target '{}'",
            "OK".green().bold(),
            include.as_str().cyan(),
            target
        ),
    }
    Ok(())
}

/// Remove every rule of a target with the given include pattern.
pub fn run_remove_rule(source: &Path, target: &str, pattern: &str) -> Result<()> {
    let include = Pattern::parse(pattern)?;

    let mut registry = TargetRegistry::load(source)?;
    let removed = registry.remove_rule(target, &include)?;

    if removed == 0 {
        println!(
            "{} No rule '{}' found for target '{}'",
            "WARN".yellow().bold(),
            include.as_str(),
            target
        );
        return Ok(());
    }
    registry.save(source)?;

    println!(
        "{} Removed {} rule(s) '{}' from target '{}'",
        "OK".green().bold(),
        removed,
        include.as_str().cyan(),
        target
    );
    Ok(())
}

/// List every target's rules with what they currently match.
pub fn run_list_rules(source: &Path, json: bool) -> Result<()> {
    let registry = TargetRegistry::load(source)?;
    let targets = registry.targets();

    let nested: Vec<PathBuf> = targets
        .iter()
        .map(|t| t.resolved_root(source))
        .filter(|root| root.starts_with(source))
        .collect();
    let snapshot = TreeSnapshot::capture_excluding(source, &nested)?;

    let mut listing = Vec::with_capacity(targets.len());
    for target in &targets {
        let resolution = registry.rule_set(&target.name)?.resolve(&snapshot);
        listing.push((target, target.resolved_root(source), resolution));
    }

    if json {
        let targets: Vec<_> = listing
            .iter()
            .map(|(target, root, resolution)| {
                json!({
                    "name": target.name,
                    "root": root.display().to_string(),
                    "rules": resolution
                        .rule_matches()
                        .iter()
                        .map(|m| rule_json(m, root))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let output = json!({
            "source": source.display().to_string(),
            "targets": targets,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return Ok(());
    }

    if listing.is_empty() {
        println!("{} No targets configured.", "WARN".yellow().bold());
        println!("Run {} to add one.", "arbor init -t <dir>".cyan());
        return Ok(());
    }

    for (target, root, resolution) in &listing {
        println!(
            "{} {} {}",
            target.name.cyan().bold(),
            "->".dimmed(),
            root.display()
        );
        if resolution.rule_matches().is_empty() {
            println!("   {}", "(no rules)".dimmed());
        }
        for rule in resolution.rule_matches() {
            print_rule(rule, root);
        }
        println!();
    }
    Ok(())
}

/// Why a rule contributes nothing. A literal include that matched nothing
/// names a path missing from the source.
fn no_match_note(rule: &RuleMatch) -> &'static str {
    if rule.include.is_literal() && rule.direct() == 0 {
        "(no matches: path does not exist)"
    } else {
        "(no matches)"
    }
}

fn print_rule(rule: &RuleMatch, root: &Path) {
    let label = match &rule.exclude {
        Some(exclude) => format!("{} {} {}", rule.include, "excluding".dimmed(), exclude),
        None => rule.include.to_string(),
    };
    if rule.contributed() == 0 {
        println!("   {} {} {}", "-".yellow(), label, no_match_note(rule).yellow());
        return;
    }
    println!(
        "   {} {} {}",
        "+".green(),
        label,
        format!("({} paths)", rule.contributed()).dimmed()
    );
    for matched in rule.roots() {
        let suffix = if matched.is_dir { "/" } else { "" };
        println!(
            "      {}{} {} {}",
            matched.path,
            suffix,
            "->".dimmed(),
            root.join(&matched.path).display()
        );
    }
}

fn rule_json(rule: &RuleMatch, root: &Path) -> serde_json::Value {
    json!({
        "include": rule.include.as_str(),
        "exclude": rule.exclude.as_ref().map(Pattern::as_str),
        "direct_matches": rule.direct(),
        "matches": rule.contributed(),
        "roots": rule
            .roots()
            .iter()
            .map(|m| json!({
                "path": m.path,
                "is_dir": m.is_dir,
                "target_path": root.join(&m.path).display().to_string(),
            }))
            .collect::<Vec<_>>(),
    })
}
