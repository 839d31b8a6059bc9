use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use settings_fs::RoamingScope;
use settings_git::{GitRepositoryManager, IndexDiff, RepositoryManager};
use settings_test_utils::fixtures::{LOCAL_XML, REMOTE_XML};
use tempfile::TempDir;

fn setup_manager() -> (TempDir, GitRepositoryManager) {
    let temp = TempDir::new().unwrap();
    let manager = GitRepositoryManager::open_or_init(temp.path()).unwrap();
    (temp, manager)
}

fn names(set: &std::collections::BTreeSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

#[test]
fn test_add() {
    let (_temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();

    let diff = manager.index_diff().unwrap();
    assert!(diff.diff());
    assert_eq!(names(&diff.added), vec!["remote.xml"]);
    assert!(diff.changed.is_empty());
    assert!(diff.removed.is_empty());
    assert!(diff.modified.is_empty());
    assert!(diff.untracked.is_empty());
    assert!(diff.untracked_folders.is_empty());
}

#[test]
fn test_add_several() {
    let (_temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager
        .save("local.xml", LOCAL_XML, RoamingScope::PerUser)
        .unwrap();

    let diff = manager.index_diff().unwrap();
    assert!(diff.diff());
    assert_eq!(names(&diff.added), vec!["local.xml", "remote.xml"]);
    assert!(diff.changed.is_empty());
    assert!(diff.removed.is_empty());
    assert!(diff.modified.is_empty());
    assert!(diff.untracked.is_empty());
}

#[rstest]
#[case::file("remote.xml")]
#[case::root("")]
fn test_save_then_delete_leaves_no_diff(#[case] delete_path: &str) {
    let (temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager.delete(delete_path, RoamingScope::PerUser).unwrap();

    assert_eq!(manager.index_diff().unwrap(), IndexDiff::default());
    assert!(!temp.path().join("remote.xml").exists());
    assert!(temp.path().join(".git").is_dir());
}

#[test]
fn test_delete_directory_of_committed_files_is_removed() {
    let (_temp, manager) = setup_manager();
    manager
        .save("keymap.xml", LOCAL_XML, RoamingScope::PerOs)
        .unwrap();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager.commit("initial").unwrap();

    let prefix = RoamingScope::os_prefix();
    let removed = manager.delete(prefix, RoamingScope::PerUser).unwrap();
    assert_eq!(removed.len(), 1);

    let diff = manager.index_diff().unwrap();
    assert_eq!(
        names(&diff.removed),
        vec![format!("{}/keymap.xml", prefix).as_str()]
    );
    assert!(diff.added.is_empty());
}

#[test]
fn test_staged_change_of_committed_file() {
    let (_temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager.commit("initial").unwrap();

    manager
        .save("remote.xml", LOCAL_XML, RoamingScope::PerUser)
        .unwrap();

    let diff = manager.index_diff().unwrap();
    assert_eq!(names(&diff.changed), vec!["remote.xml"]);
    assert!(diff.added.is_empty());
    assert!(diff.modified.is_empty());
}

#[test]
fn test_unstaged_edits_are_modified() {
    let (temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager
        .save("local.xml", LOCAL_XML, RoamingScope::PerUser)
        .unwrap();
    manager.commit("initial").unwrap();

    fs::write(temp.path().join("remote.xml"), "<edited/>").unwrap();
    fs::remove_file(temp.path().join("local.xml")).unwrap();

    let diff = manager.index_diff().unwrap();
    assert_eq!(names(&diff.modified), vec!["local.xml", "remote.xml"]);
    assert!(diff.removed.is_empty());
    assert!(diff.changed.is_empty());
}

#[test]
fn test_untracked_files_and_folders() {
    let (temp, manager) = setup_manager();
    fs::write(temp.path().join("stray.xml"), "x").unwrap();
    fs::create_dir_all(temp.path().join("options/nested")).unwrap();
    fs::write(temp.path().join("options/nested/a.xml"), "a").unwrap();

    let diff = manager.index_diff().unwrap();
    assert_eq!(names(&diff.untracked), vec!["stray.xml"]);
    assert_eq!(names(&diff.untracked_folders), vec!["options"]);
    assert!(diff.added.is_empty());
}

#[test]
fn test_index_diff_is_idempotent() {
    let (_temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();

    let first = manager.index_diff().unwrap();
    let second = manager.index_diff().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_clean_after_commit() {
    let (_temp, manager) = setup_manager();
    manager
        .save("remote.xml", REMOTE_XML, RoamingScope::PerUser)
        .unwrap();
    manager.commit("initial").unwrap();

    let diff = manager.index_diff().unwrap();
    assert!(!diff.diff());
    assert!(!diff.has_conflicts());
}
