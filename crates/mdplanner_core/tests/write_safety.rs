use mdplanner_core::{DocumentError, DocumentFile, WriteSafetyConfig};
use std::fs;
use std::path::{Path, PathBuf};

fn backups_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries.map(|entry| entry.unwrap().path()).collect();
    files.sort();
    files
}

fn temp_files_in(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

#[test]
fn write_snapshots_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.md");
    let file = DocumentFile::open(&path, WriteSafetyConfig::default());

    file.write("first\n").unwrap();
    assert!(backups_in(&dir.path().join("backups")).is_empty());

    file.write("second\n").unwrap();
    let backups = backups_in(&dir.path().join("backups"));
    assert_eq!(backups.len(), 1);
    let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("plan_backup_"));
    assert!(name.ends_with(".md"));
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "first\n");
    assert_eq!(file.read().unwrap().as_deref(), Some("second\n"));
}

#[test]
fn unchanged_content_is_not_snapshotted_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.md");
    let file = DocumentFile::open(&path, WriteSafetyConfig::default());

    file.write("same\n").unwrap();
    file.write("same\n").unwrap();
    file.write("same\n").unwrap();

    assert_eq!(backups_in(&dir.path().join("backups")).len(), 1);
}

#[test]
fn backups_are_pruned_to_the_configured_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let backup_dir = dir.path().join("snapshots");
    let config = WriteSafetyConfig {
        backup_dir: Some(backup_dir.clone()),
        max_backups: 3,
        backups_enabled: true,
    };
    let file = DocumentFile::open(dir.path().join("plan.md"), config);

    for n in 0..7 {
        file.write(&format!("revision {n}\n")).unwrap();
    }

    let backups = backups_in(&backup_dir);
    assert_eq!(backups.len(), 3);
    let contents: Vec<String> = backups
        .iter()
        .map(|path| fs::read_to_string(path).unwrap())
        .collect();
    assert!(contents.contains(&"revision 5\n".to_string()));
}

#[test]
fn disabled_backups_write_nothing_extra() {
    let dir = tempfile::tempdir().unwrap();
    let file = DocumentFile::open(
        dir.path().join("plan.md"),
        WriteSafetyConfig::without_backups(),
    );

    file.write("one\n").unwrap();
    file.write("two\n").unwrap();

    assert!(!dir.path().join("backups").exists());
    assert!(temp_files_in(dir.path()).is_empty());
}

#[test]
fn modify_skips_write_when_closure_declines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.md");
    let file = DocumentFile::open(&path, WriteSafetyConfig::without_backups());

    assert!(file
        .modify(|current| {
            assert_eq!(current, "");
            Ok(Some("created\n".to_string()))
        })
        .unwrap());
    assert!(!file.modify(|_| Ok(None)).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "created\n");
}

#[test]
fn failed_write_keeps_directory_clean() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("plan.md");
    fs::create_dir(&target).unwrap();
    let file = DocumentFile::open(&target, WriteSafetyConfig::default());

    let err = file.write("content\n").unwrap_err();
    assert!(matches!(err, DocumentError::Io { .. }));
    assert!(temp_files_in(dir.path()).is_empty());
    assert!(target.is_dir());
}

#[test]
fn missing_document_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let file = DocumentFile::open(dir.path().join("absent.md"), WriteSafetyConfig::default());

    assert!(file.read().unwrap().is_none());
}
