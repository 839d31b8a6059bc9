//! [`UpstreamFixture`]: a bare upstream repository plus a checkout of it.
//!
//! Syncing pushes into the bare repository; the checkout lets tests edit
//! and commit on the upstream side and compare work trees afterwards. Call
//! [`UpstreamFixture::reset_hard`] after a push to bring the checkout up to
//! date with what was pushed.

use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, RepositoryInitOptions, ResetType, Signature};
use tempfile::TempDir;

use crate::fixtures;

/// A temporary bare upstream with a mirrored work tree.
pub struct UpstreamFixture {
    _temp_dir: TempDir,
    git_dir: PathBuf,
    work_tree: PathBuf,
}

impl UpstreamFixture {
    /// An upstream without any commit (uninitialized).
    ///
    /// # Panics
    /// Panics if the repository cannot be created.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("UpstreamFixture: tempdir: {e}"));
        let git_dir = temp_dir.path().join("upstream.git");
        let work_tree = temp_dir.path().join("upstream");
        fs::create_dir_all(&work_tree)
            .unwrap_or_else(|e| panic!("UpstreamFixture: failed to create work tree: {e}"));

        let mut options = RepositoryInitOptions::new();
        options.bare(true).initial_head("master");
        Repository::init_opts(&git_dir, &options).unwrap_or_else(|e| {
            panic!(
                "UpstreamFixture: failed to init bare repository at {}: {e}",
                git_dir.display()
            )
        });

        Self {
            _temp_dir: temp_dir,
            git_dir,
            work_tree,
        }
    }

    /// An upstream whose branch holds one commit adding `remote.xml`.
    ///
    /// With `branch`, the upstream first gets an empty commit on `master`,
    /// then `branch` is created from it and checked out before `remote.xml`
    /// is committed there.
    pub fn new(branch: Option<&str>) -> Self {
        let fixture = Self::empty();
        if let Some(branch) = branch {
            fixture.commit("");
            fixture.checkout_new_branch(branch);
        }
        fixture.write_path("remote.xml", fixtures::REMOTE_XML);
        fixture.commit("");
        fixture
    }

    /// Location of the bare repository, usable as an upstream URL.
    pub fn url(&self) -> String {
        self.git_dir.to_string_lossy().into_owned()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The checkout mirroring the upstream branch.
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Open the upstream with the mirror attached as its work tree.
    ///
    /// # Panics
    /// Panics if the repository cannot be opened.
    pub fn repository(&self) -> Repository {
        let repo = Repository::open_bare(&self.git_dir)
            .unwrap_or_else(|e| panic!("UpstreamFixture: failed to open upstream: {e}"));
        repo.set_workdir(&self.work_tree, false)
            .unwrap_or_else(|e| panic!("UpstreamFixture: failed to attach work tree: {e}"));
        repo
    }

    /// Write a file into the checkout and stage it.
    pub fn write_path(&self, path: &str, content: &[u8]) {
        let full_path = self.work_tree.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("write_path: failed to create {}: {e}", parent.display()));
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("write_path: failed to write {}: {e}", full_path.display()));

        let repo = self.repository();
        let mut index = repo.index().unwrap();
        index
            .add_path(Path::new(path))
            .unwrap_or_else(|e| panic!("write_path: failed to stage {path}: {e}"));
        index.write().unwrap();
    }

    /// Delete a file from the checkout and stage the removal.
    pub fn delete_path(&self, path: &str) {
        let full_path = self.work_tree.join(path);
        if full_path.exists() {
            fs::remove_file(&full_path)
                .unwrap_or_else(|e| panic!("delete_path: failed to remove {}: {e}", full_path.display()));
        }

        let repo = self.repository();
        let mut index = repo.index().unwrap();
        index
            .remove_path(Path::new(path))
            .unwrap_or_else(|e| panic!("delete_path: failed to unstage {path}: {e}"));
        index.write().unwrap();
    }

    /// Commit the staged state on the current upstream branch.
    pub fn commit(&self, message: &str) -> Oid {
        let repo = self.repository();
        let signature = Signature::now("Upstream", "upstream@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap_or_else(|e| panic!("UpstreamFixture::commit failed: {e}"))
    }

    /// Current upstream commit, `None` while uninitialized.
    pub fn head(&self) -> Option<Oid> {
        self.repository().head().ok().and_then(|head| head.target())
    }

    /// Make the checkout match the upstream branch after a push.
    ///
    /// An upstream without commits ends up with an empty checkout.
    pub fn reset_hard(&self) {
        let repo = self.repository();
        match repo.head().ok().and_then(|head| head.peel_to_commit().ok()) {
            Some(commit) => {
                repo.reset(commit.as_object(), ResetType::Hard, None)
                    .unwrap_or_else(|e| panic!("UpstreamFixture::reset_hard failed: {e}"));
                let mut checkout = CheckoutBuilder::new();
                checkout.force().remove_untracked(true);
                repo.checkout_head(Some(&mut checkout))
                    .unwrap_or_else(|e| panic!("UpstreamFixture::reset_hard failed: {e}"));
            }
            None => {
                let mut index = repo.index().unwrap();
                index.clear().unwrap();
                index.write().unwrap();
                for entry in fs::read_dir(&self.work_tree).unwrap() {
                    let path = entry.unwrap().path();
                    if path.is_dir() {
                        fs::remove_dir_all(&path).unwrap();
                    } else {
                        fs::remove_file(&path).unwrap();
                    }
                }
            }
        }
    }

    fn checkout_new_branch(&self, branch: &str) {
        let repo = self.repository();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(branch, &head, false)
            .unwrap_or_else(|e| panic!("UpstreamFixture: failed to create branch {branch}: {e}"));
        repo.set_head(&format!("refs/heads/{branch}")).unwrap();
    }
}
