//! Multi-step workflows across arbor-fs, arbor-core and the registry file

use arbor_core::{
    CancelFlag, Compare, ExecuteOptions, Executor, OperationKind, Pattern, PlanOptions, Planner,
    TargetRegistry,
};
use arbor_fs::{CONFIG_FILE_NAME, canonicalize_root};
use arbor_test_utils::TestTree;
use pretty_assertions::assert_eq;

fn p(raw: &str) -> Pattern {
    Pattern::parse(raw).unwrap()
}

#[test]
fn registry_survives_save_and_reload() {
    let source = TestTree::new();
    let shared = TestTree::new();
    let docs = TestTree::new();

    let mut registry = TargetRegistry::new();
    registry
        .init_target("shared", shared.root().to_path_buf())
        .unwrap();
    registry.init_target("docs", docs.root().to_path_buf()).unwrap();
    registry
        .add_rule("shared", p("libs/auth"), Some(p("**/__pycache__")))
        .unwrap();
    registry.add_rule("docs", p("docs/**/*.md"), None).unwrap();
    registry.save(source.root()).unwrap();

    let reloaded = TargetRegistry::load(source.root()).unwrap();

    assert_eq!(reloaded, registry);
    let names: Vec<String> = reloaded.targets().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["docs", "shared"]);
    assert!(source.read(CONFIG_FILE_NAME).contains("exclude = \"**/__pycache__\""));
    assert!(source.temp_files().is_empty());
}

#[test]
fn hand_edited_invalid_pattern_fails_to_load() {
    let source = TestTree::new().file(
        CONFIG_FILE_NAME,
        "[targets.shared]\nroot = \"/tmp/shared\"\n\n[[targets.shared.rules]]\ninclude = \"../up\"\n",
    );

    let err = TargetRegistry::load(source.root()).unwrap_err();

    assert!(err.to_string().contains(".."), "unexpected error: {err}");
}

#[test]
fn replace_existing_mirrors_matched_directories() {
    let source = TestTree::new()
        .file("libs/auth/a.py", "new a")
        .file("libs/auth/b.py", "b");
    let target = TestTree::new()
        .file("libs/auth/a.py", "old a, longer")
        .file("libs/auth/stale.py", "stale")
        .file("libs/auth/old/deep.py", "deep")
        .file("unrelated.txt", "keep me");
    let rules = arbor_core::RuleSet::from_patterns("shared", [(p("libs/auth"), None)]);

    let plan = Planner::new(PlanOptions {
        replace_existing: true,
        ..PlanOptions::default()
    })
    .plan(&rules, source.root(), target.root())
    .unwrap();
    let deletions: Vec<&str> = plan
        .operations
        .iter()
        .filter(|op| op.kind == OperationKind::Delete)
        .map(|op| op.path.as_str())
        .collect();
    assert_eq!(deletions, vec!["libs/auth/stale.py", "libs/auth/old"]);

    let result = Executor::default().execute(&plan);

    assert!(result.success(), "{:?}", result.failures);
    assert_eq!(result.counts.files_deleted, 2);
    assert_eq!(
        target.entries(),
        vec!["libs", "libs/auth", "libs/auth/a.py", "libs/auth/b.py", "unrelated.txt"]
    );
    target.assert_file_content("libs/auth/a.py", "new a");
}

#[test]
fn filter_narrows_an_apply_to_one_subtree() {
    let source = TestTree::new()
        .file("libs/auth/a.py", "a")
        .file("libs/core/b.py", "b");
    let target = TestTree::new();
    let rules = arbor_core::RuleSet::from_patterns("shared", [(p("libs"), None)]);

    let plan = Planner::new(PlanOptions {
        filter: Some(p("libs/core")),
        ..PlanOptions::default()
    })
    .plan(&rules, source.root(), target.root())
    .unwrap();
    let result = Executor::default().execute(&plan);

    assert!(result.success());
    target.assert_file_exists("libs/core/b.py");
    target.assert_file_not_exists("libs/auth");
    assert_eq!(plan.statistics.total_files, 1);
}

#[test]
fn checksum_mode_catches_same_size_edits() {
    let source = TestTree::new().file("data.bin", "aaaa");
    let target = TestTree::new().file("data.bin", "bbbb");
    source.set_mtime("data.bin", 1_700_000_000);
    target.set_mtime("data.bin", 1_700_000_000);
    let rules = arbor_core::RuleSet::from_patterns("shared", [(p("data.bin"), None)]);

    let quick = Planner::default()
        .plan(&rules, source.root(), target.root())
        .unwrap();
    assert_eq!(quick.stats.files_unchanged, 1);

    let thorough = Planner::new(PlanOptions {
        compare: Compare::Checksum,
        ..PlanOptions::default()
    })
    .plan(&rules, source.root(), target.root())
    .unwrap();
    assert_eq!(thorough.stats.conflicts, 1);
}

#[test]
fn target_nested_in_source_is_not_copied_into_itself() {
    let source = TestTree::new()
        .file("src/main.rs", "fn main() {}")
        .dir("mirror");
    let source_root = canonicalize_root(source.root()).unwrap();
    let mirror = source_root.join("mirror");
    let rules = arbor_core::RuleSet::from_patterns("mirror", [(p("**"), None)]);

    let plan = Planner::default()
        .plan(&rules, &source_root, &mirror)
        .unwrap();
    let result = Executor::default().execute(&plan);
    assert!(result.success());

    source.assert_file_exists("mirror/src/main.rs");
    source.assert_file_not_exists("mirror/mirror");

    let again = Planner::default()
        .plan(&rules, &source_root, &mirror)
        .unwrap();
    assert!(again.is_noop());
}

#[test]
fn cancelled_run_starts_nothing_and_leaves_no_temp_files() {
    let source = TestTree::new()
        .file("a/1.txt", "1")
        .file("a/2.txt", "2")
        .file("a/3.txt", "3");
    let target = TestTree::new();
    let rules = arbor_core::RuleSet::from_patterns("shared", [(p("a"), None)]);
    let plan = Planner::default()
        .plan(&rules, source.root(), target.root())
        .unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = Executor::new(ExecuteOptions {
        cancel,
        ..ExecuteOptions::default()
    })
    .execute(&plan);

    assert!(result.cancelled);
    assert!(!result.success());
    assert_eq!(result.not_started, plan.stats.pending());
    assert!(target.is_empty());
    assert!(target.temp_files().is_empty());
}

#[test]
fn result_serializes_for_scripting() {
    let source = TestTree::new().file("a.txt", "abc");
    let target = TestTree::new();
    let rules = arbor_core::RuleSet::from_patterns("shared", [(p("a.txt"), None)]);
    let plan = Planner::default()
        .plan(&rules, source.root(), target.root())
        .unwrap();

    let result = Executor::default().execute(&plan);
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["target"], "shared");
    assert_eq!(value["direction"], "forward");
    assert_eq!(value["counts"]["files_copied"], 1);
    assert_eq!(value["counts"]["bytes_copied"], 3);
    assert_eq!(value["failures"], serde_json::json!([]));
}
