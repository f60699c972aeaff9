//! Apply command implementation
//!
//! Plans every selected target before touching anything, so a missing root
//! or a bad filter aborts the whole run with nothing copied. Plans are then
//! executed one target at a time.

use std::path::{Path, PathBuf};

use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use arbor_core::{
    CancelFlag, Compare, Direction, ExecuteOptions, Executor, FileStatistics, Pattern,
    PlanOptions, Planner, SyncPlan, SyncResult, TargetRegistry,
};
use arbor_fs::NormalizedPath;

use crate::cli::ApplyArgs;
use crate::error::{CliError, Result, exit};

/// Syncs copying more files than this ask for confirmation.
pub const CONFIRM_THRESHOLD: usize = 1000;

/// Run `arbor apply` and return the process exit code.
pub fn run_apply(source: &Path, args: &ApplyArgs, cancel: CancelFlag, interactive: bool) -> Result<i32> {
    if args.jobs == Some(0) {
        return Err(CliError::user("--jobs must be at least 1"));
    }
    let filter = args.filter.as_deref().map(Pattern::parse).transpose()?;

    let registry = TargetRegistry::load(source)?;
    let targets = registry.select(args.target.as_deref())?;
    if targets.is_empty() {
        return Err(CliError::user(
            "No targets configured. Run `arbor init -t <dir>` first.",
        ));
    }

    let planner = Planner::new(PlanOptions {
        direction: if args.reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        },
        replace_existing: args.replace_existing,
        compare: if args.checksum {
            Compare::Checksum
        } else {
            Compare::SizeAndMtime
        },
        filter,
    });

    let mut plans = Vec::with_capacity(targets.len());
    for target in &targets {
        let root = target.existing_root(source)?;
        let rules = registry.rule_set(&target.name)?;
        plans.push(planner.plan(&rules, source, &root)?);
    }

    let mut statistics = FileStatistics::default();
    for plan in &plans {
        statistics.merge(&plan.statistics);
    }

    if !args.json {
        for plan in &plans {
            print_plan_header(plan);
        }
        print_statistics(&statistics);
        print_preview(&plans, args.limit);
    }

    if args.stats_only {
        if args.json {
            print_json(&plans, &statistics, &[]);
        } else {
            println!();
            println!("{} Stats-only mode: nothing was synced.", "OK".green().bold());
        }
        return Ok(exit::SUCCESS);
    }

    let files_to_copy: usize = plans.iter().map(|p| p.stats.files_to_copy).sum();
    if needs_confirmation(args, files_to_copy, interactive) {
        println!();
        println!(
            "{} This will copy {} files.",
            "WARN".yellow().bold(),
            files_to_copy
        );
        let proceed = Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("{} Aborted; nothing was synced.", "WARN".yellow().bold());
            return Ok(exit::SUCCESS);
        }
    }

    let mut options = ExecuteOptions {
        dry_run: args.dry,
        cancel: cancel.clone(),
        ..ExecuteOptions::default()
    };
    if let Some(jobs) = args.jobs {
        options.jobs = jobs;
    }
    let executor = Executor::new(options);

    let mut results = Vec::with_capacity(plans.len());
    for plan in &plans {
        if cancel.is_cancelled() {
            break;
        }
        results.push(executor.execute(plan));
    }
    let interrupted = cancel.is_cancelled() || results.iter().any(|r| r.cancelled);

    if args.json {
        print_json(&plans, &statistics, &results);
    } else {
        println!();
        for result in &results {
            print_result(result, args.limit);
        }
        if interrupted {
            println!(
                "{} Interrupted; remaining operations were not started.",
                "WARN".yellow().bold()
            );
        }
    }

    Ok(exit_code(&results, interrupted))
}

fn needs_confirmation(args: &ApplyArgs, files_to_copy: usize, interactive: bool) -> bool {
    interactive && !args.dry && !args.yes && files_to_copy > CONFIRM_THRESHOLD
}

/// Failures outrank conflicts; an interrupt outranks both.
fn exit_code(results: &[SyncResult], interrupted: bool) -> i32 {
    if interrupted {
        exit::INTERRUPTED
    } else if results.iter().any(|r| !r.failures.is_empty()) {
        exit::FAILURES
    } else if results.iter().any(SyncResult::has_conflicts) {
        exit::CONFLICTS
    } else {
        exit::SUCCESS
    }
}

fn print_plan_header(plan: &SyncPlan) {
    println!(
        "{} {} ({}): {} {} {}",
        "=>".blue().bold(),
        plan.target.cyan().bold(),
        plan.direction,
        plan.from_root.display(),
        "->".dimmed(),
        plan.to_root.display()
    );
    for rule in &plan.rule_matches {
        if rule.contributed() == 0 {
            println!(
                "   {} rule '{}' matches nothing",
                "WARN".yellow().bold(),
                rule.include
            );
        }
    }
}

fn print_statistics(statistics: &FileStatistics) {
    println!();
    println!("{}", "File statistics".bold());
    let rows = statistics.rows();
    let width = rows
        .iter()
        .map(|row| row.extension.chars().count())
        .fold("[TOTAL FILES]".len(), usize::max);
    for row in &rows {
        println!(
            "   {:<width$}  {:>8}  {:>6.1}%",
            row.extension,
            row.count,
            row.percentage,
        );
    }
    println!(
        "   {:<width$}  {:>8}",
        "[TOTAL FILES]".bold(),
        statistics.total_files
    );
    println!(
        "   {:<width$}  {:>8}",
        "[TOTAL DIRS]".bold(),
        statistics.total_dirs
    );
}

/// A file copy shown in the preview.
#[derive(Debug, PartialEq, Eq)]
struct PreviewRow {
    path: String,
    destination: PathBuf,
    size: u64,
}

/// The first `limit` file copies across all plans, and how many were left out.
fn preview_rows(plans: &[SyncPlan], limit: usize) -> (Vec<PreviewRow>, usize) {
    let mut copies = plans
        .iter()
        .flat_map(|plan| plan.file_copies().map(move |op| (plan, op)));
    let rows: Vec<PreviewRow> = copies
        .by_ref()
        .take(limit)
        .map(|(plan, op)| PreviewRow {
            path: op.path.clone(),
            destination: NormalizedPath::new(&op.path).under(&plan.to_root),
            size: op.size,
        })
        .collect();
    (rows, copies.count())
}

fn print_preview(plans: &[SyncPlan], limit: usize) {
    if limit == 0 {
        return;
    }
    let total: usize = plans.iter().map(|p| p.stats.files_to_copy).sum();
    if total == 0 {
        println!();
        println!("{} Nothing to copy.", "OK".green().bold());
        return;
    }
    let (rows, remaining) = preview_rows(plans, limit);

    println!();
    println!(
        "{} {}",
        format!("Preview (first {} of {} files):", rows.len(), total).bold(),
        human_size(plans.iter().map(|p| p.stats.bytes_total).sum()).dimmed()
    );
    let width = rows.iter().map(|r| r.path.chars().count()).max().unwrap_or(0);
    for row in &rows {
        println!(
            "   {} {:<width$}  {} {}  {}",
            "FILE".green(),
            row.path,
            "->".dimmed(),
            row.destination.display(),
            human_size(row.size).yellow(),
        );
    }
    if remaining > 0 {
        println!("   {}", format!("... and {remaining} more files").dimmed());
    }
}

fn print_result(result: &SyncResult, limit: usize) {
    let counts = &result.counts;
    let (label, verb) = if result.dry_run {
        ("DRY".cyan().bold(), "would copy")
    } else {
        ("OK".green().bold(), "copied")
    };
    println!(
        "{} {}: {} {} files ({}), {} dirs created, {} deleted, {} unchanged",
        label,
        result.target.cyan(),
        verb,
        counts.files_copied,
        human_size(counts.bytes_copied),
        counts.dirs_created,
        counts.files_deleted,
        counts.files_unchanged,
    );

    if result.has_conflicts() {
        println!(
            "   {} {} conflicting files skipped (use {} to overwrite):",
            "WARN".yellow().bold(),
            result.conflicts.len(),
            "--replace-existing".cyan()
        );
        for path in result.conflicts.iter().take(limit.max(1)) {
            println!("      {} {}", "!".yellow(), path);
        }
        if result.conflicts.len() > limit.max(1) {
            println!(
                "      {}",
                format!("... and {} more", result.conflicts.len() - limit.max(1)).dimmed()
            );
        }
    }

    for failure in &result.failures {
        println!(
            "   {} {}: {}",
            "FAILED".red().bold(),
            failure.path,
            failure.cause
        );
    }
}

fn print_json(plans: &[SyncPlan], statistics: &FileStatistics, results: &[SyncResult]) {
    let targets: Vec<_> = plans
        .iter()
        .map(|plan| {
            json!({
                "target": plan.target,
                "direction": plan.direction,
                "from": plan.from_root.display().to_string(),
                "to": plan.to_root.display().to_string(),
                "plan": plan.stats,
                "unmatched_rules": plan
                    .rule_matches
                    .iter()
                    .filter(|m| m.contributed() == 0)
                    .map(|m| m.include.as_str())
                    .collect::<Vec<_>>(),
                "result": results.iter().find(|r| r.target == plan.target),
            })
        })
        .collect();
    let output = json!({
        "statistics": statistics,
        "extensions": statistics.rows(),
        "targets": targets,
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}

/// Format a byte count with binary units.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{OperationFailure, RuleSet, SyncCounts};
    use arbor_test_utils::TestTree;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use crate::cli::{Cli, Commands};

    fn apply_args(extra: &[&str]) -> ApplyArgs {
        let argv = ["arbor", "apply"].into_iter().chain(extra.iter().copied());
        match Cli::parse_from(argv).command {
            Some(Commands::Apply(args)) => args,
            _ => panic!("Expected Apply command"),
        }
    }

    fn result(failures: usize, conflicts: usize) -> SyncResult {
        SyncResult {
            target: "shared".into(),
            direction: Direction::Forward,
            dry_run: false,
            counts: SyncCounts::default(),
            conflicts: (0..conflicts).map(|i| format!("c{i}")).collect(),
            failures: (0..failures)
                .map(|i| OperationFailure {
                    path: format!("f{i}"),
                    cause: "denied".into(),
                })
                .collect(),
            cancelled: false,
            not_started: 0,
        }
    }

    /// A source tree with a `shared` target registered and one rule.
    fn registered(source: &TestTree, target: &TestTree, pattern: &str) {
        let mut registry = TargetRegistry::new();
        registry
            .init_target("shared", target.root().to_path_buf())
            .unwrap();
        registry
            .add_rule("shared", Pattern::parse(pattern).unwrap(), None)
            .unwrap();
        registry.save(source.root()).unwrap();
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1024), "1.0 KB");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn exit_code_precedence() {
        assert_eq!(exit_code(&[result(0, 0)], false), exit::SUCCESS);
        assert_eq!(exit_code(&[result(0, 2)], false), exit::CONFLICTS);
        assert_eq!(exit_code(&[result(0, 2), result(1, 0)], false), exit::FAILURES);
        assert_eq!(exit_code(&[result(1, 1)], true), exit::INTERRUPTED);
        assert_eq!(exit_code(&[], false), exit::SUCCESS);
    }

    #[test]
    fn confirmation_only_for_large_interactive_runs() {
        let args = apply_args(&[]);
        assert!(!needs_confirmation(&args, CONFIRM_THRESHOLD, true));
        assert!(needs_confirmation(&args, CONFIRM_THRESHOLD + 1, true));
        assert!(!needs_confirmation(&args, CONFIRM_THRESHOLD + 1, false));
        assert!(!needs_confirmation(&apply_args(&["--yes"]), 5000, true));
        assert!(!needs_confirmation(&apply_args(&["--dry"]), 5000, true));
    }

    #[test]
    fn preview_is_limited() {
        let source = TestTree::new()
            .file("libs/a.py", "a")
            .file("libs/b.py", "bb")
            .file("libs/c.py", "ccc");
        let target = TestTree::new();
        let rules = RuleSet::from_patterns("shared", [(Pattern::parse("libs").unwrap(), None)]);
        let plan = Planner::default()
            .plan(&rules, source.root(), target.root())
            .unwrap();

        let (rows, remaining) = preview_rows(std::slice::from_ref(&plan), 2);

        assert_eq!(rows.len(), 2);
        assert_eq!(remaining, 1);
        assert_eq!(rows[0].path, "libs/a.py");
        assert_eq!(rows[1].size, 2);
        assert_eq!(rows[0].destination, plan.to_root.join("libs").join("a.py"));
    }

    #[test]
    fn apply_copies_and_second_run_is_clean() {
        let source = TestTree::new().file("libs/auth/a.py", "print('a')");
        let target = TestTree::new();
        registered(&source, &target, "libs/auth");

        let code = run_apply(source.root(), &apply_args(&[]), CancelFlag::new(), false).unwrap();
        assert_eq!(code, exit::SUCCESS);
        target.assert_file_content("libs/auth/a.py", "print('a')");

        let before = target.fingerprint();
        let code = run_apply(source.root(), &apply_args(&[]), CancelFlag::new(), false).unwrap();
        assert_eq!(code, exit::SUCCESS);
        assert_eq!(target.fingerprint(), before);
    }

    #[test]
    fn dry_run_and_stats_only_touch_nothing() {
        let source = TestTree::new().file("libs/auth/a.py", "a");
        let target = TestTree::new();
        registered(&source, &target, "libs/**");

        run_apply(source.root(), &apply_args(&["--dry"]), CancelFlag::new(), false).unwrap();
        run_apply(source.root(), &apply_args(&["--stats-only"]), CancelFlag::new(), false).unwrap();

        assert!(target.is_empty());
    }

    #[test]
    fn conflicts_map_to_exit_code() {
        let source = TestTree::new().file("notes.txt", "source");
        let target = TestTree::new().file("notes.txt", "target!");
        registered(&source, &target, "notes.txt");

        let code = run_apply(source.root(), &apply_args(&[]), CancelFlag::new(), false).unwrap();

        assert_eq!(code, exit::CONFLICTS);
        target.assert_file_content("notes.txt", "target!");
    }

    #[test]
    fn missing_target_root_aborts_before_copying() {
        let source = TestTree::new().file("a.txt", "a");
        let target = TestTree::new();
        registered(&source, &target, "a.txt");
        let gone = target.root().to_path_buf();
        drop(target);

        let err = run_apply(source.root(), &apply_args(&[]), CancelFlag::new(), false).unwrap_err();

        assert_eq!(err.exit_code(), exit::CONFIG);
        assert!(!gone.exists());
    }

    #[test]
    fn cancelled_before_start_reports_interrupt() {
        let source = TestTree::new().file("a.txt", "a");
        let target = TestTree::new();
        registered(&source, &target, "a.txt");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let code = run_apply(source.root(), &apply_args(&[]), cancel, false).unwrap();

        assert_eq!(code, exit::INTERRUPTED);
        target.assert_file_not_exists("a.txt");
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let source = TestTree::new();
        let err = run_apply(source.root(), &apply_args(&["-j", "0"]), CancelFlag::new(), false)
            .unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
    }
}
