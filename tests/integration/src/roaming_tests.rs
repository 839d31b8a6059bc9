//! Several machines roaming settings through one upstream
//!
//! Each `Machine` is an independent settings root; they only meet through
//! the shared bare upstream.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use settings_core::{
    Error, MarkerResolver, PreferResolver, SettingsSync, SyncPolicy, SyncState, SyncTarget,
};
use settings_fs::RoamingScope;
use settings_git::{CancellationToken, MergeOutcome, Side};
use settings_test_utils::UpstreamFixture;
use settings_test_utils::tree::{file_names, snapshot};
use tempfile::TempDir;

struct Machine {
    root: TempDir,
    sync: SettingsSync<settings_git::GitRepositoryManager>,
}

impl Machine {
    fn join(upstream: &UpstreamFixture) -> Self {
        let root = TempDir::new().unwrap();
        let sync = SettingsSync::open(root.path(), MarkerResolver::new()).unwrap();
        sync.set_upstream(&upstream.url(), None).unwrap();
        Self { root, sync }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn save(&self, path: &str, content: &str) {
        self.sync
            .save(path, content.as_bytes(), RoamingScope::PerUser)
            .unwrap();
    }

    fn read(&self, path: &str) -> Option<String> {
        self.sync
            .read(path)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    fn sync(&self) -> settings_core::SyncReport {
        self.sync
            .sync(SyncPolicy::Merge, &SyncTarget::new("application"))
            .unwrap()
    }
}

#[test]
fn settings_roam_between_machines() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);

    laptop.save("editor.xml", "<editor font=\"12\" />");
    laptop.sync();

    desktop.sync();
    assert_eq!(file_names(desktop.path()), vec!["editor.xml", "remote.xml"]);

    desktop.save("editor.xml", "<editor font=\"14\" />");
    desktop.sync();

    let report = laptop.sync();
    assert!(matches!(report.merge, Some(MergeOutcome::FastForward { .. })));
    assert_eq!(laptop.read("editor.xml").unwrap(), "<editor font=\"14\" />");
    assert_eq!(snapshot(laptop.path()), snapshot(desktop.path()));
}

#[test]
fn edits_to_different_files_merge_cleanly() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);
    laptop.sync();
    desktop.sync();

    laptop.save("editor.xml", "<editor />");
    desktop.save("keymap.xml", "<keymap />");
    laptop.sync();
    let report = desktop.sync();

    assert!(matches!(
        report.merge,
        Some(MergeOutcome::Merged { ref resolved, .. }) if resolved.is_empty()
    ));
    laptop.sync();
    assert_eq!(
        file_names(laptop.path()),
        vec!["editor.xml", "keymap.xml", "remote.xml"]
    );
    assert_eq!(snapshot(laptop.path()), snapshot(desktop.path()));
}

#[test]
fn conflicting_edits_wait_for_a_decision() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);
    laptop.save("editor.xml", "<editor />");
    laptop.sync();
    desktop.sync();

    laptop.save("editor.xml", "<editor theme=\"light\" />");
    desktop.save("editor.xml", "<editor theme=\"dark\" />");
    laptop.sync();

    let result = desktop
        .sync
        .sync(SyncPolicy::Merge, &SyncTarget::new("application"));
    assert!(matches!(
        result,
        Err(Error::Git(settings_git::Error::UnresolvedConflict { ref paths })) if paths == &["editor.xml"]
    ));
    assert_eq!(desktop.sync.state(), SyncState::ConflictPending);

    desktop
        .sync
        .sync_with(
            SyncPolicy::Merge,
            &SyncTarget::new("application"),
            &PreferResolver(Side::Mine),
            &CancellationToken::new(),
        )
        .unwrap();
    laptop.sync();

    assert_eq!(laptop.read("editor.xml").unwrap(), "<editor theme=\"dark\" />");
    assert_eq!(snapshot(laptop.path()), snapshot(desktop.path()));
}

#[test]
fn deletions_roam() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);
    laptop.save("editor.xml", "<editor />");
    laptop.sync();
    desktop.sync();

    desktop
        .sync
        .delete("editor.xml", RoamingScope::PerUser)
        .unwrap();
    desktop.sync();
    laptop.sync();

    assert_eq!(laptop.read("editor.xml"), None);
    assert_eq!(file_names(laptop.path()), vec!["remote.xml"]);
}

#[test]
fn per_os_settings_stay_under_their_prefix() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);

    let saved = laptop
        .sync
        .save("keymap.xml", b"<keymap />", RoamingScope::PerOs)
        .unwrap();
    laptop.sync();
    desktop.sync();

    let expected = format!("{}/keymap.xml", RoamingScope::os_prefix());
    assert_eq!(saved.as_str(), expected);
    assert!(desktop.path().join(&expected).is_file());
    assert!(!desktop.path().join("keymap.xml").exists());
}

#[test]
fn overwrite_remote_replaces_what_others_pushed() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    let desktop = Machine::join(&upstream);
    laptop.save("editor.xml", "<editor />");
    laptop.sync();
    desktop.sync();

    laptop.save("laptop-only.xml", "<laptop />");
    laptop.sync();

    desktop.save("editor.xml", "<editor from=\"desktop\" />");
    desktop
        .sync
        .sync(SyncPolicy::OverwriteRemote, &SyncTarget::new("application"))
        .unwrap();

    upstream.reset_hard();
    assert_eq!(snapshot(upstream.work_tree()), snapshot(desktop.path()));

    // the laptop adopts the new upstream state instead of merging its own back in
    laptop
        .sync
        .sync(SyncPolicy::OverwriteLocal, &SyncTarget::new("application"))
        .unwrap();
    assert_eq!(laptop.read("laptop-only.xml"), None);
    assert_eq!(snapshot(laptop.path()), snapshot(desktop.path()));
}

#[test]
fn overwrite_local_drops_unsynced_changes() {
    let upstream = UpstreamFixture::new(None);
    let laptop = Machine::join(&upstream);
    laptop.sync();

    laptop.save("scratch.xml", "<scratch />");
    fs::write(laptop.path().join("remote.xml"), "<edited />").unwrap();
    laptop
        .sync
        .sync(SyncPolicy::OverwriteLocal, &SyncTarget::new("application"))
        .unwrap();

    assert_eq!(file_names(laptop.path()), vec!["remote.xml"]);
    assert!(!laptop.sync.index_diff().unwrap().diff());
    upstream.reset_hard();
    assert_eq!(snapshot(laptop.path()), snapshot(upstream.work_tree()));
}
