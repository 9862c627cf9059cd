use std::fs;

use convq_engine::{ensure_output_dir, prepare_destination, OutputError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn prepare_destination_creates_nested_parent() {
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("a").join("b").join("clip.mkv");
    prepare_destination(&destination).unwrap();
    assert!(destination.parent().unwrap().is_dir());
    assert!(!destination.exists());
}

#[test]
fn prepare_destination_rejects_directory_target() {
    let temp = TempDir::new().unwrap();
    let err = prepare_destination(temp.path()).unwrap_err();
    assert!(matches!(err, OutputError::DestinationIsDir(_)));
}

#[test]
fn parent_that_is_a_file_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let err = prepare_destination(&file_path.join("clip.mp4")).unwrap_err();
    assert!(matches!(err, OutputError::OutputDir(_)));
}
