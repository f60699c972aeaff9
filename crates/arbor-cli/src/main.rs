//! arbor CLI
//!
//! The command-line interface for sharing parts of a directory tree with
//! other directories.

mod cli;
mod commands;
mod context;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use arbor_core::CancelFlag;
use cli::{Cli, Commands};
use error::{Result, exit};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let source = cli.source.as_deref();

    let Some(command) = cli.command else {
        println!("{} Rule-based directory sync", "arbor".green().bold());
        println!();
        println!("Run {} for available commands.", "arbor --help".cyan());
        return Ok(exit::SUCCESS);
    };

    match command {
        Commands::Init { target, name } => {
            let source = context::init_source_root(source, &cwd)?;
            let target = context::absolute(&target, &cwd);
            commands::run_init(&source, &target, name.as_deref(), commands::is_interactive())?;
        }
        Commands::AddRule {
            pattern,
            target,
            exclude,
        } => {
            let source = context::source_root(source, &cwd)?;
            commands::run_add_rule(&source, &target, &pattern, exclude.as_deref())?;
        }
        Commands::RemoveRule { pattern, target } => {
            let source = context::source_root(source, &cwd)?;
            commands::run_remove_rule(&source, &target, &pattern)?;
        }
        Commands::ListRules { json } => {
            let source = context::source_root(source, &cwd)?;
            commands::run_list_rules(&source, json)?;
        }
        Commands::Apply(args) => {
            let source = context::source_root(source, &cwd)?;
            return commands::run_apply(&source, &args, interrupt_flag(), commands::is_interactive());
        }
        Commands::PrintConfig { format } => {
            let source = context::source_root(source, &cwd)?;
            commands::run_print_config(&source, format)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "arbor", &mut std::io::stdout());
        }
    }
    Ok(exit::SUCCESS)
}

/// A cancel flag raised by Ctrl-C. In-flight copies finish; nothing new starts.
fn interrupt_flag() -> CancelFlag {
    let cancel = CancelFlag::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    cancel
}
