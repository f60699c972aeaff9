//! Print-config command implementation

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use arbor_core::TargetRegistry;

use crate::cli::ConfigFormat;
use crate::error::Result;

/// Print the registry stored in `source`.
pub fn run_print_config(source: &Path, format: ConfigFormat) -> Result<()> {
    let registry = TargetRegistry::load(source)?;
    match format {
        ConfigFormat::Json => println!("{}", render_json(&registry, source)?),
        ConfigFormat::Table => print_table(&registry, source)?,
    }
    Ok(())
}

fn render_json(registry: &TargetRegistry, source: &Path) -> Result<String> {
    let mut targets = serde_json::Map::new();
    for target in registry.targets() {
        let rules: Vec<_> = registry
            .rules(&target.name)?
            .iter()
            .map(|rule| {
                json!({
                    "include": rule.include.as_str(),
                    "exclude": rule.exclude.as_ref().map(|e| e.as_str()),
                })
            })
            .collect();
        targets.insert(
            target.name.clone(),
            json!({
                "root": target.resolved_root(source).display().to_string(),
                "rules": rules,
            }),
        );
    }
    let output = json!({
        "source": source.display().to_string(),
        "targets": targets,
    });
    Ok(serde_json::to_string_pretty(&output).unwrap_or_default())
}

fn print_table(registry: &TargetRegistry, source: &Path) -> Result<()> {
    println!(
        "{} {}",
        "Source:".dimmed(),
        TargetRegistry::config_path(source).display()
    );
    if registry.is_empty() {
        println!("{}", "(no targets)".dimmed());
        return Ok(());
    }

    let rows = table_rows(registry, source)?;
    let widths = [
        column_width("TARGET", rows.iter().map(|r| r[0].as_str())),
        column_width("ROOT", rows.iter().map(|r| r[1].as_str())),
        column_width("INCLUDE", rows.iter().map(|r| r[2].as_str())),
    ];

    println!();
    println!(
        "{:<w0$}  {:<w1$}  {:<w2$}  {}",
        "TARGET".bold(),
        "ROOT".bold(),
        "INCLUDE".bold(),
        "EXCLUDE".bold(),
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
    for row in &rows {
        println!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            row[0].cyan(),
            row[1],
            row[2],
            row[3].yellow(),
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
    }
    Ok(())
}

/// One row per rule; a target without rules still gets a row.
fn table_rows(registry: &TargetRegistry, source: &Path) -> Result<Vec<[String; 4]>> {
    let mut rows = Vec::new();
    for target in registry.targets() {
        let root = target.resolved_root(source).display().to_string();
        let rules = registry.rules(&target.name)?;
        if rules.is_empty() {
            rows.push([target.name.clone(), root, "-".into(), "-".into()]);
            continue;
        }
        for rule in rules {
            rows.push([
                target.name.clone(),
                root.clone(),
                rule.include.to_string(),
                rule.exclude
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ]);
        }
    }
    Ok(rows)
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|v| v.chars().count()).fold(header.len(), usize::max)
}
