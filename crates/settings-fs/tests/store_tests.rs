//! Tests for the settings content store

use pretty_assertions::assert_eq;
use rstest::rstest;
use settings_fs::{ContentStore, RoamingScope};
use tempfile::TempDir;

fn store() -> (TempDir, ContentStore) {
    let temp = TempDir::new().unwrap();
    let store = ContentStore::open(temp.path().join("settings")).unwrap();
    (temp, store)
}

fn listed(store: &ContentStore) -> Vec<String> {
    store
        .list()
        .unwrap()
        .into_iter()
        .map(|p| p.to_string())
        .collect()
}

#[test]
fn test_save_overwrites_existing_content() {
    let (_temp, store) = store();

    store.save("remote.xml", b"first").unwrap();
    store.save("remote.xml", b"second").unwrap();

    assert_eq!(store.read("remote.xml").unwrap(), Some(b"second".to_vec()));
}

#[test]
fn test_read_missing_is_none() {
    let (_temp, store) = store();
    assert_eq!(store.read("absent.xml").unwrap(), None);
}

#[rstest]
#[case::single_file("remote.xml")]
#[case::whole_root("")]
fn test_delete_after_save_leaves_nothing(#[case] target: &str) {
    let (_temp, store) = store();
    store.save("remote.xml", b"<application/>").unwrap();

    let removed = store.delete(target, RoamingScope::PerUser).unwrap();

    assert_eq!(removed.len(), 1);
    assert!(listed(&store).is_empty());
}

#[test]
fn test_delete_directory_removes_nested_entries() {
    let (_temp, store) = store();
    store.save("keymaps/Default.xml", b"a").unwrap();
    store.save("keymaps/custom/Mine.xml", b"b").unwrap();
    store.save("editor.xml", b"c").unwrap();

    let removed = store.delete("keymaps", RoamingScope::PerUser).unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(listed(&store), vec!["editor.xml".to_string()]);
    assert!(!store.root().join("keymaps").exists());
}

#[test]
fn test_delete_missing_is_noop() {
    let (_temp, store) = store();
    let removed = store.delete("nothing/here", RoamingScope::PerUser).unwrap();
    assert!(removed.is_empty());
}

#[test]
fn test_delete_empty_root_is_noop() {
    let (_temp, store) = store();
    let removed = store.delete("", RoamingScope::PerUser).unwrap();
    assert!(removed.is_empty());
    assert!(store.root().exists());
}

#[test]
fn test_per_os_scope_lands_under_prefix() {
    let (_temp, store) = store();

    let path = store
        .save_in(RoamingScope::PerOs, "keymap.xml", b"os")
        .unwrap();

    assert!(path.as_str().starts_with(RoamingScope::os_prefix()));
    store.delete("keymap.xml", RoamingScope::PerOs).unwrap();
    assert!(listed(&store).is_empty());
}

#[rstest]
#[case("../escape.xml")]
#[case("/abs.xml")]
#[case(".git/config")]
fn test_rejects_paths_outside_settings(#[case] path: &str) {
    let (_temp, store) = store();
    assert!(store.save(path, b"x").is_err());
}

#[test]
fn test_list_is_sorted() {
    let (_temp, store) = store();
    store.save("remote.xml", b"r").unwrap();
    store.save("local.xml", b"l").unwrap();
    store.save("_mac/local2.xml", b"m").unwrap();

    assert_eq!(
        listed(&store),
        vec![
            "_mac/local2.xml".to_string(),
            "local.xml".to_string(),
            "remote.xml".to_string(),
        ]
    );
}
