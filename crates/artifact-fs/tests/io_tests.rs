use artifact_fs::io;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model.mlmodel");

    io::write_atomic(&path, b"hello world").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"hello world");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model.mlmodel");
    fs::write(&path, "original").unwrap();

    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_creates_missing_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a").join("models").join("model.mlmodel");

    io::write_atomic(&path, b"deep").unwrap();

    assert_eq!(io::read_bytes(&path).unwrap(), b"deep");
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model.mlmodel");

    io::write_atomic(&path, b"one").unwrap();
    io::write_atomic(&path, b"two").unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["model.mlmodel".to_string()]);
}

#[test]
fn test_read_bytes_nonexistent_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = io::read_bytes(&temp.path().join("missing")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_replace_path_moves_file_over_existing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("produced.bin");
    let target = temp.path().join("model.mlmodelc");
    fs::write(&source, "new").unwrap();
    fs::write(&target, "old").unwrap();

    io::replace_path(&source, &target).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    assert!(!source.exists());
}

#[test]
fn test_replace_path_swaps_directory_bundle() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("produced");
    let target = temp.path().join("model.mlmodelc");
    fs::create_dir_all(source.join("weights")).unwrap();
    fs::write(source.join("weights").join("w.bin"), "new weights").unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("stale.bin"), "stale").unwrap();

    io::replace_path(&source, &target).unwrap();

    assert_eq!(
        fs::read_to_string(target.join("weights").join("w.bin")).unwrap(),
        "new weights"
    );
    assert!(!target.join("stale.bin").exists());

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "staging paths left behind: {leftovers:?}");
}

#[test]
fn test_replace_path_same_path_is_noop() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("model.mlmodelc");
    fs::write(&target, "compiled").unwrap();

    io::replace_path(&target, &target).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "compiled");
}

#[test]
fn test_remove_path_ignores_missing() {
    let temp = TempDir::new().unwrap();
    io::remove_path(&temp.path().join("nothing")).unwrap();
}
