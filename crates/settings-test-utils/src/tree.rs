//! Work tree snapshots for comparing local and upstream state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

/// Every file below `root` keyed by its slash-separated relative path.
///
/// `.git` entries are skipped at any depth.
///
/// # Panics
/// Panics if the directory cannot be read.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    if root.is_dir() {
        collect(root, "", &mut files);
    }
    files
}

fn collect(dir: &Path, prefix: &str, out: &mut BTreeMap<String, Vec<u8>>) {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("snapshot: failed to read {}: {e}", dir.display()));
    for entry in entries {
        let entry = entry.unwrap_or_else(|e| panic!("snapshot: bad entry in {}: {e}", dir.display()));
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == ".git" {
            continue;
        }
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            collect(&path, &relative, out);
        } else {
            let content = fs::read(&path)
                .unwrap_or_else(|e| panic!("snapshot: failed to read {}: {e}", path.display()));
            out.insert(relative, content);
        }
    }
}

/// Sorted file list of a work tree.
pub fn file_names(root: &Path) -> Vec<String> {
    snapshot(root).into_keys().collect()
}

/// Assert that two work trees hold the same files with the same bytes and
/// that exactly `expected` files are present.
///
/// # Panics
/// Panics with a diff of the file lists or of the first differing file.
pub fn assert_same_tree(local: &Path, remote: &Path, expected: &[&str]) {
    assert_same_tree_except(local, remote, expected, &[]);
}

/// Like [`assert_same_tree`], but paths in `excluded` only have to exist
/// locally and are ignored on the remote side.
pub fn assert_same_tree_except(local: &Path, remote: &Path, expected: &[&str], excluded: &[&str]) {
    let mut local_files = snapshot(local);
    let mut remote_files = snapshot(remote);

    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(
        local_files.keys().cloned().collect::<Vec<_>>(),
        expected,
        "local work tree has unexpected files"
    );

    for path in excluded {
        local_files.remove(*path);
        remote_files.remove(*path);
    }

    assert_eq!(
        local_files.keys().collect::<Vec<_>>(),
        remote_files.keys().collect::<Vec<_>>(),
        "local and remote work trees list different files"
    );
    for (path, content) in &local_files {
        assert_eq!(
            String::from_utf8_lossy(content),
            String::from_utf8_lossy(&remote_files[path]),
            "content of {path} differs between local and remote"
        );
    }
}
