use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use settings_core::{
    Error, MARKER_ACCEPT_MY, MARKER_ACCEPT_THEIRS, MarkerResolver, PreferResolver, SettingsSync,
    SyncPolicy, SyncState, SyncTarget, WorkTreeMirror,
};
use settings_fs::RoamingScope;
use settings_git::{
    CancellationToken, GitRepositoryManager, MergeOutcome, RepositoryManager, Side,
};
use settings_test_utils::UpstreamFixture;
use settings_test_utils::fixtures::{self, LOCAL_XML, REMOTE_XML};
use settings_test_utils::tree::{assert_same_tree, file_names};
use tempfile::TempDir;

struct Harness {
    local: TempDir,
    upstream: UpstreamFixture,
    sync: SettingsSync<GitRepositoryManager>,
}

impl Harness {
    /// Local repository pointed at an upstream holding `remote.xml`.
    fn new() -> Self {
        Self::with_upstream(UpstreamFixture::new(None), None)
    }

    /// Local repository pointed at an upstream without commits.
    fn uninitialized() -> Self {
        Self::with_upstream(UpstreamFixture::empty(), None)
    }

    fn with_upstream(upstream: UpstreamFixture, branch: Option<&str>) -> Self {
        let local = TempDir::new().unwrap();
        let sync = SettingsSync::open(local.path(), MarkerResolver::strict()).unwrap();
        sync.set_upstream(&upstream.url(), branch).unwrap();
        Self {
            local,
            upstream,
            sync,
        }
    }

    fn save(&self, path: &str, content: &[u8]) {
        self.sync
            .save(path, content, RoamingScope::PerUser)
            .unwrap();
    }

    fn add_and_commit(&self, path: &str) {
        self.save(path, fixtures::data_for(path));
        self.sync.commit(None).unwrap();
    }

    fn sync(&self, policy: SyncPolicy) {
        self.sync.sync(policy, &SyncTarget::default()).unwrap();
    }

    /// Bring the upstream checkout up to date, then compare both trees.
    fn assert_synced(&self, expected: &[&str]) {
        self.upstream.reset_hard();
        assert_same_tree(self.local.path(), self.upstream.work_tree(), expected);
    }
}

#[test]
fn test_reset_to_theirs_if_first_merge() {
    let h = Harness::new();
    h.add_and_commit("local.xml");

    h.sync(SyncPolicy::OverwriteLocal);

    assert_same_tree(h.local.path(), h.upstream.work_tree(), &["remote.xml"]);
    assert_eq!(h.sync.state(), SyncState::Idle);
}

#[test]
fn test_reset_to_theirs_second_merge_is_null() {
    let h = Harness::new();
    h.add_and_commit("local.xml");
    h.sync(SyncPolicy::Merge);
    h.assert_synced(&["local.xml", "remote.xml"]);

    h.add_and_commit("_mac/local2.xml");
    h.sync(SyncPolicy::OverwriteLocal);
    assert_same_tree(
        h.local.path(),
        h.upstream.work_tree(),
        &["local.xml", "remote.xml"],
    );

    // merge and push after such reset
    h.sync(SyncPolicy::Merge);
    h.assert_synced(&["local.xml", "remote.xml"]);
}

#[test]
fn test_reset_to_my_if_first_merge() {
    let h = Harness::new();
    h.add_and_commit("local.xml");

    h.sync(SyncPolicy::OverwriteRemote);

    h.assert_synced(&["local.xml"]);
}

#[test]
fn test_reset_to_my_second_merge_is_null() {
    let h = Harness::new();
    h.add_and_commit("local.xml");
    h.sync(SyncPolicy::Merge);
    h.assert_synced(&["local.xml", "remote.xml"]);

    h.add_and_commit("_mac/local2.xml");
    h.sync(SyncPolicy::OverwriteRemote);
    h.assert_synced(&["_mac/local2.xml", "local.xml", "remote.xml"]);

    // merge to remote after such reset
    h.sync(SyncPolicy::Merge);
    h.assert_synced(&["_mac/local2.xml", "local.xml", "remote.xml"]);
}

#[test]
fn test_merge_resolve_conflicts_to_my() {
    let h = Harness::new();
    h.save("remote.xml", MARKER_ACCEPT_MY);

    let report = h
        .sync
        .sync(SyncPolicy::Merge, &SyncTarget::default())
        .unwrap();

    assert_eq!(report.resolved, vec!["remote.xml".to_string()]);
    assert!(report.pushed.is_some());
    h.assert_synced(&["remote.xml"]);
    assert_eq!(
        fs::read(h.local.path().join("remote.xml")).unwrap(),
        MARKER_ACCEPT_MY
    );
}

#[test]
fn test_merge_theirs_file_deleted_my_modified_accept_theirs() {
    let h = Harness::new();
    h.sync(SyncPolicy::Merge);

    h.save("remote.xml", MARKER_ACCEPT_THEIRS);
    h.sync.commit(None).unwrap();

    h.upstream.delete_path("remote.xml");
    h.upstream.commit("delete remote.xml");

    h.sync(SyncPolicy::Merge);

    h.assert_synced(&[]);
}

#[test]
fn test_merge_my_file_deleted_theirs_modified_accept_my() {
    let h = Harness::new();
    h.sync(SyncPolicy::Merge);

    h.sync.delete("remote.xml", RoamingScope::PerUser).unwrap();
    h.sync.commit(None).unwrap();

    h.upstream.write_path("remote.xml", MARKER_ACCEPT_THEIRS);
    h.upstream.commit("");

    h.sync(SyncPolicy::Merge);

    h.assert_synced(&[]);
}

#[test]
fn test_commit_if_unmerged() {
    let h = Harness::new();
    h.save("remote.xml", b"<foo />");

    let result = h.sync.sync(SyncPolicy::Merge, &SyncTarget::default());
    assert!(matches!(
        result,
        Err(Error::Git(settings_git::Error::CannotResolveInAutomatedMode { .. }))
    ));
    // repository in unmerged state
    assert_eq!(h.sync.state(), SyncState::ConflictPending);
    assert!(h.sync.with_manager(|m| m.is_merging().unwrap()));

    let report = h
        .sync
        .sync_with(
            SyncPolicy::Merge,
            &SyncTarget::default(),
            &PreferResolver(Side::Theirs),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(report.resolved, vec!["remote.xml".to_string()]);
    assert_eq!(h.sync.state(), SyncState::Idle);
    h.assert_synced(&["remote.xml"]);
    assert_eq!(
        fs::read(h.local.path().join("remote.xml")).unwrap(),
        REMOTE_XML
    );
}

#[test]
fn test_pending_conflict_survives_reopen() {
    let h = Harness::new();
    h.save("remote.xml", b"<foo />");
    let _ = h.sync.sync(SyncPolicy::Merge, &SyncTarget::default());

    let reopened = SettingsSync::open(h.local.path(), MarkerResolver::strict()).unwrap();
    assert_eq!(reopened.state(), SyncState::ConflictPending);
}

#[test]
fn test_overwrite_local_discards_pending_merge() {
    let h = Harness::new();
    h.save("remote.xml", b"<foo />");
    let _ = h.sync.sync(SyncPolicy::Merge, &SyncTarget::default());

    h.sync(SyncPolicy::OverwriteLocal);

    assert!(!h.sync.with_manager(|m| m.is_merging().unwrap()));
    assert_same_tree(h.local.path(), h.upstream.work_tree(), &["remote.xml"]);
}

#[rstest]
#[case::merge(SyncPolicy::Merge)]
#[case::reset_to_my(SyncPolicy::OverwriteRemote)]
#[case::reset_to_theirs(SyncPolicy::OverwriteLocal)]
fn test_sync_with_uninitialized_upstream(#[case] policy: SyncPolicy) {
    let h = Harness::uninitialized();
    h.save("local.xml", LOCAL_XML);

    h.sync(policy);

    let expected: &[&str] = if policy == SyncPolicy::OverwriteLocal {
        &[]
    } else {
        &["local.xml"]
    };
    h.assert_synced(expected);
}

#[rstest]
#[case::default_branch(None)]
#[case::custom_branch(Some("customRemoteBranchName"))]
fn test_merge_pushes_to_configured_branch(#[case] branch: Option<&str>) {
    let h = Harness::with_upstream(UpstreamFixture::new(branch), branch);
    h.add_and_commit("local.xml");

    h.sync(SyncPolicy::Merge);

    h.assert_synced(&["local.xml", "remote.xml"]);
}

#[test]
fn test_overwrite_remote_from_empty_local_empties_upstream() {
    let h = Harness::new();

    let report = h
        .sync
        .sync(SyncPolicy::OverwriteRemote, &SyncTarget::default())
        .unwrap();

    assert!(report.pushed.is_some());
    h.assert_synced(&[]);
}

#[test]
fn test_second_merge_is_noop() {
    let h = Harness::new();
    h.add_and_commit("local.xml");
    h.sync(SyncPolicy::Merge);

    let report = h
        .sync
        .sync(SyncPolicy::Merge, &SyncTarget::default())
        .unwrap();

    assert!(report.is_noop(), "unexpected work: {:?}", report);
    assert_eq!(report.merge, Some(MergeOutcome::UpToDate));
    assert_eq!(report.push_attempts, 0);
}

#[test]
fn test_post_push_hook_mirrors_upstream() {
    let local = TempDir::new().unwrap();
    let upstream = UpstreamFixture::new(None);
    let sync = SettingsSync::open(local.path(), MarkerResolver::strict())
        .unwrap()
        .with_post_push(WorkTreeMirror::new(upstream.work_tree()));
    sync.set_upstream(&upstream.url(), None).unwrap();
    sync.save("local.xml", LOCAL_XML, RoamingScope::PerUser)
        .unwrap();
    fs::write(upstream.work_tree().join("stray.xml"), "x").unwrap();

    sync.sync(SyncPolicy::Merge, &SyncTarget::default()).unwrap();

    assert_eq!(
        file_names(upstream.work_tree()),
        vec!["local.xml".to_string(), "remote.xml".to_string()]
    );
}

#[test]
fn test_cancelled_sync_keeps_local_commit() {
    let h = Harness::new();
    h.save("local.xml", LOCAL_XML);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = h.sync.sync_with(
        SyncPolicy::Merge,
        &SyncTarget::default(),
        &MarkerResolver::strict(),
        &cancel,
    );

    let error = result.unwrap_err();
    assert!(error.is_cancelled(), "unexpected error: {}", error);
    assert_eq!(h.sync.state(), SyncState::Idle);
    assert!(!h.sync.index_diff().unwrap().diff());
    assert!(h.upstream.head().is_some());
    assert_eq!(h.sync.history(10).unwrap().len(), 1);
}

#[test]
fn test_sync_without_upstream_fails() {
    let local = TempDir::new().unwrap();
    let sync = SettingsSync::open(local.path(), MarkerResolver::strict()).unwrap();
    sync.save("local.xml", LOCAL_XML, RoamingScope::PerUser)
        .unwrap();

    let result = sync.sync(SyncPolicy::Merge, &SyncTarget::default());
    assert!(matches!(
        result,
        Err(Error::Git(settings_git::Error::NoUpstream))
    ));
}

#[test]
fn test_unreadable_merge_state() {
    let local = TempDir::new().unwrap();
    drop(SettingsSync::open(local.path(), MarkerResolver::strict()).unwrap());
    fs::write(local.path().join(".git/index"), b"not an index").unwrap();

    assert!(SettingsSync::open(local.path(), MarkerResolver::strict()).is_err());

    let manager = GitRepositoryManager::open_or_init(local.path()).unwrap();
    let sync = SettingsSync::new(manager, MarkerResolver::strict());
    assert_eq!(sync.state(), SyncState::Idle);
}
