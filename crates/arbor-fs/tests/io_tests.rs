use arbor_fs::{NormalizedPath, RobustnessConfig, io};
use assert_fs::prelude::*;
use filetime::FileTime;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("test.txt"));

    io::write_atomic(&path, b"hello world", RobustnessConfig::default()).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.txt");
    fs::write(&file_path, "original").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::write_atomic(&path, b"updated", RobustnessConfig::no_retry()).unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("nested/deeper/test.txt"));

    io::write_atomic(&path, b"hello", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "hello");
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("test.txt"));

    io::write_atomic(&path, b"hello", RobustnessConfig::default()).unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["test.txt".to_string()]);
}

#[test]
fn test_copy_atomic_preserves_content_and_mtime() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src.txt");
    let dst = temp.path().join("dst.txt");
    fs::write(&src, "payload").unwrap();
    let mtime = FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&src, mtime).unwrap();

    let bytes = io::copy_atomic(&src, &dst, RobustnessConfig::default()).unwrap();

    assert_eq!(bytes, 7);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
    let copied = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
    assert_eq!(copied, mtime);
}

#[test]
fn test_copy_atomic_replaces_existing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.child("src.txt");
    let dst = temp.child("dst.txt");
    src.write_str("new").unwrap();
    dst.write_str("old content").unwrap();

    io::copy_atomic(src.path(), dst.path(), RobustnessConfig::default()).unwrap();

    dst.assert("new");
    src.assert("new");
}

#[test]
fn test_copy_atomic_missing_source_leaves_destination() {
    let temp = TempDir::new().unwrap();
    let dst = temp.path().join("dst.txt");
    fs::write(&dst, "keep").unwrap();

    let result = io::copy_atomic(&temp.path().join("missing"), &dst, RobustnessConfig::default());

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "keep");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn test_copy_atomic_missing_parent_fails() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src.txt");
    fs::write(&src, "x").unwrap();

    let result = io::copy_atomic(&src, &temp.path().join("no/such/dir/dst.txt"), RobustnessConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_remove_path_handles_files_and_trees() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("f.txt");
    let tree = temp.child("tree");
    file.write_str("x").unwrap();
    tree.child("nested/g.txt").write_str("y").unwrap();
    temp.child("keep.txt").write_str("z").unwrap();

    io::remove_path(file.path()).unwrap();
    io::remove_path(tree.path()).unwrap();

    file.assert(predicate::path::missing());
    tree.assert(predicate::path::missing());
    temp.child("keep.txt").assert(predicate::path::is_file());
}

#[test]
fn test_remove_path_missing_is_an_error() {
    let temp = assert_fs::TempDir::new().unwrap();

    let result = io::remove_path(temp.child("absent").path());

    assert!(result.is_err());
    temp.assert(predicate::path::is_dir());
}

#[test]
fn test_read_text_nonexistent_file() {
    let path = NormalizedPath::new("/nonexistent/file.txt");
    let result = io::read_text(&path);
    assert!(result.is_err());
}
