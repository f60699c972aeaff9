//! Reference scenarios, driven through the registry as the CLI drives them
//!
//! Each scenario persists its rules to `arbor.toml`, reloads them, plans and
//! executes, then inspects both trees.

use std::path::Path;

use arbor_core::{
    Direction, ExecuteOptions, Executor, OperationKind, Pattern, PlanOptions, Planner,
    SyncResult, TargetRegistry, TreeSnapshot,
};
use arbor_test_utils::TestTree;
use pretty_assertions::assert_eq;

/// Register `name` -> `target` with one rule and save it under `source`.
fn register(source: &TestTree, target: &TestTree, name: &str, include: &str, exclude: Option<&str>) {
    let mut registry = TargetRegistry::load_or_default(source.root()).unwrap();
    registry
        .init_target(name, target.root().to_path_buf())
        .unwrap();
    registry
        .add_rule(
            name,
            Pattern::parse(include).unwrap(),
            exclude.map(|e| Pattern::parse(e).unwrap()),
        )
        .unwrap();
    registry.save(source.root()).unwrap();
}

fn apply(source: &Path, name: &str, options: PlanOptions) -> SyncResult {
    let registry = TargetRegistry::load(source).unwrap();
    let target = registry.target(name).unwrap();
    let root = target.existing_root(source).unwrap();
    let plan = Planner::new(options)
        .plan(&registry.rule_set(name).unwrap(), source, &root)
        .unwrap();
    Executor::new(ExecuteOptions::default()).execute(&plan)
}

#[test]
fn scenario_a_only_the_matched_subtree_is_copied() {
    let source = TestTree::new()
        .file("libs/auth/a.py", "print('auth')")
        .file("libs/other/b.py", "print('other')");
    let target = TestTree::new();
    register(&source, &target, "shared", "libs/auth", None);

    let result = apply(source.root(), "shared", PlanOptions::default());

    assert!(result.success());
    assert_eq!(result.counts.files_copied, 1);
    target.assert_file_content("libs/auth/a.py", "print('auth')");
    target.assert_file_not_exists("libs/other/b.py");
    target.assert_file_not_exists("libs/other");
    assert_eq!(target.entries(), vec!["libs", "libs/auth", "libs/auth/a.py"]);
}

#[test]
fn scenario_b_exclude_narrows_recursive_include() {
    let source = TestTree::new()
        .file("docs/readme.md", "# readme")
        .file("docs/internal/secret.md", "# secret");
    let target = TestTree::new();
    register(
        &source,
        &target,
        "docs",
        "docs/**/*.md",
        Some("docs/internal/*"),
    );

    let registry = TargetRegistry::load(source.root()).unwrap();
    let snapshot = TreeSnapshot::capture(source.root()).unwrap();
    let resolution = registry.rule_set("docs").unwrap().resolve(&snapshot);
    let resolved: Vec<String> = resolution.paths().into_iter().map(|m| m.path).collect();
    assert_eq!(resolved, vec!["docs/readme.md"]);

    let result = apply(source.root(), "docs", PlanOptions::default());

    assert!(result.success());
    target.assert_file_exists("docs/readme.md");
    target.assert_file_not_exists("docs/internal/secret.md");
}

#[test]
fn scenario_c_forward_then_reverse_is_a_fixed_point() {
    let source = TestTree::new()
        .file("libs/auth/a.py", "a")
        .file("libs/auth/nested/b.py", "b")
        .dir("libs/auth/empty");
    let target = TestTree::new();
    register(&source, &target, "shared", "libs/auth", None);

    let first = apply(source.root(), "shared", PlanOptions::default());
    assert!(first.success());

    for direction in [Direction::Reverse, Direction::Forward] {
        let registry = TargetRegistry::load(source.root()).unwrap();
        let plan = Planner::new(PlanOptions {
            direction,
            ..PlanOptions::default()
        })
        .plan(
            &registry.rule_set("shared").unwrap(),
            source.root(),
            target.root(),
        )
        .unwrap();

        assert!(plan.is_noop(), "{direction} plan should be empty: {:?}", plan.operations);
        assert_eq!(plan.stats.conflicts, 0);
    }
}

#[test]
fn scenario_d_conflict_is_reported_and_destination_kept() {
    let source = TestTree::new().file("config/app.toml", "port = 80");
    let target = TestTree::new().file("config/app.toml", "port = 8080");
    register(&source, &target, "shared", "config", None);

    let result = apply(source.root(), "shared", PlanOptions::default());

    assert!(result.success(), "conflicts are not failures");
    assert!(result.has_conflicts());
    assert_eq!(result.conflicts, vec!["config/app.toml"]);
    assert_eq!(result.counts.files_copied, 0);
    target.assert_file_content("config/app.toml", "port = 8080");

    let registry = TargetRegistry::load(source.root()).unwrap();
    let plan = Planner::default()
        .plan(
            &registry.rule_set("shared").unwrap(),
            source.root(),
            target.root(),
        )
        .unwrap();
    let kinds: Vec<_> = plan.operations.iter().map(|op| op.kind.clone()).collect();
    assert_eq!(kinds, vec![OperationKind::SkipConflict]);
}

#[test]
fn scenario_d_with_replace_overwrites() {
    let source = TestTree::new().file("config/app.toml", "port = 80");
    let target = TestTree::new().file("config/app.toml", "port = 8080");
    register(&source, &target, "shared", "config", None);

    let result = apply(
        source.root(),
        "shared",
        PlanOptions {
            replace_existing: true,
            ..PlanOptions::default()
        },
    );

    assert!(result.success());
    assert!(!result.has_conflicts());
    target.assert_file_content("config/app.toml", "port = 80");
}
