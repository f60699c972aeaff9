//! Init command implementation

use std::io::IsTerminal;
use std::path::Path;

use colored::Colorize;
use dialoguer::Input;

use arbor_core::{InitOutcome, TargetRegistry, validate_target_name};
use arbor_fs::canonicalize_root;

use crate::error::{CliError, Result};

/// Register `target` under `source`, creating the target directory if needed.
///
/// Without `name`, the target is named after its directory; an interactive
/// session is asked to confirm or change that default.
pub fn run_init(source: &Path, target: &Path, name: Option<&str>, interactive: bool) -> Result<()> {
    if let Some(name) = name {
        validate_target_name(name)?;
    }
    println!("{} Registering target {}", "=>".blue().bold(), target.display().to_string().cyan());

    if !target.exists() {
        std::fs::create_dir_all(target)?;
        println!("   {} Created {}", "+".green(), target.display());
    } else if !target.is_dir() {
        return Err(CliError::user(format!(
            "Target is not a directory: {}",
            target.display()
        )));
    }
    let root = canonicalize_root(target)?;
    if root.as_path() == source {
        return Err(CliError::user("Target directory must differ from the source root"));
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => default_name(&root, interactive)?,
    };
    validate_target_name(&name)?;

    let mut registry = TargetRegistry::load_or_default(source)?;
    let outcome = registry.init_target(&name, root.clone())?;
    if outcome != InitOutcome::Unchanged {
        registry.save(source)?;
    }

    let message = match outcome {
        InitOutcome::Created => "registered",
        InitOutcome::Updated => "updated",
        InitOutcome::Unchanged => "already registered",
    };
    println!(
        "{} Target '{}' {} -> {}",
        "OK".green().bold(),
        name.cyan(),
        message,
        root.display()
    );
    if outcome == InitOutcome::Created {
        println!();
        println!("Add a rule with {}.", format!("arbor add-rule -t {name} -p <pattern>").cyan());
    }
    Ok(())
}

/// True when prompts can be shown.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn default_name(root: &Path, interactive: bool) -> Result<String> {
    let derived = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::user("Cannot derive a target name; pass --name"))?;

    if !interactive {
        return Ok(derived);
    }
    let name: String = Input::new()
        .with_prompt("Target name")
        .default(derived)
        .validate_with(|input: &String| validate_target_name(input).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(name)
}
