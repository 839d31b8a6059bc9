//! Content store mapping logical settings paths to bytes on disk

use std::fs;

use crate::path::GIT_DIR;
use crate::{Error, NormalizedPath, RelativePath, Result, RoamingScope, io};

/// Byte-level store for the settings root.
///
/// Settings files are opaque blobs; the store only knows how to save,
/// read, delete and enumerate them. Writes are atomic per file. The git
/// database inside the root is never listed or touched.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: NormalizedPath,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<NormalizedPath>) -> Result<Self> {
        let root: NormalizedPath = root.into();
        let native = root.to_native();
        fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))?;
        let canonical = dunce::canonicalize(&native).map_err(|e| Error::io(&native, e))?;
        Ok(Self {
            root: NormalizedPath::new(canonical),
        })
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Absolute location of a settings path.
    pub fn locate(&self, path: &RelativePath) -> NormalizedPath {
        self.root.resolve(path)
    }

    /// Write (or overwrite) a per-user settings file.
    pub fn save(&self, path: &str, content: &[u8]) -> Result<RelativePath> {
        self.save_in(RoamingScope::PerUser, path, content)
    }

    /// Write (or overwrite) a settings file in the given roaming scope.
    pub fn save_in(&self, scope: RoamingScope, path: &str, content: &[u8]) -> Result<RelativePath> {
        let relative = scope.resolve(path)?;
        self.write(&relative, content)?;
        Ok(relative)
    }

    /// Write bytes to an already validated path.
    pub fn write(&self, path: &RelativePath, content: &[u8]) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "cannot write content to the settings root".into(),
            });
        }
        tracing::trace!(path = %path, bytes = content.len(), "Saving settings file");
        io::write_atomic(&self.locate(path), content)
    }

    /// Read a per-user settings file, `None` if absent.
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let relative = RelativePath::parse(path)?;
        self.read_relative(&relative)
    }

    pub fn read_relative(&self, path: &RelativePath) -> Result<Option<Vec<u8>>> {
        let location = self.locate(path);
        if location.is_dir() {
            return Ok(None);
        }
        io::read_bytes(&location)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        let relative = RelativePath::parse(path)?;
        Ok(self.locate(&relative).exists())
    }

    /// Delete a file, or every file below a directory.
    ///
    /// The empty path addresses the whole settings root. Deleting something
    /// that does not exist succeeds without removing anything. Returns the
    /// files that were removed.
    pub fn delete(&self, path: &str, scope: RoamingScope) -> Result<Vec<RelativePath>> {
        let relative = scope.resolve(path)?;
        self.remove(&relative)
    }

    /// Delete an already validated path; see [`ContentStore::delete`].
    pub fn remove(&self, path: &RelativePath) -> Result<Vec<RelativePath>> {
        let location = self.locate(path);
        let root_native = self.root.to_native();

        if path.is_root() || location.is_dir() {
            let files = self.list_under(path)?;
            for file in &files {
                io::remove_file(&self.locate(file))?;
            }
            for file in &files {
                if let Some(parent) = self.locate(file).to_native().parent() {
                    io::prune_empty_dirs(parent, &root_native)?;
                }
            }
            if !path.is_root() {
                io::prune_empty_dirs(&location.to_native(), &root_native)?;
            }
            tracing::debug!(path = %path, removed = files.len(), "Deleted settings directory");
            return Ok(files);
        }

        if io::remove_file(&location)? {
            if let Some(parent) = location.to_native().parent() {
                io::prune_empty_dirs(parent, &root_native)?;
            }
            tracing::debug!(path = %path, "Deleted settings file");
            return Ok(vec![path.clone()]);
        }

        Ok(Vec::new())
    }

    /// Every settings file in the store, sorted.
    pub fn list(&self) -> Result<Vec<RelativePath>> {
        self.list_under(&RelativePath::root())
    }

    /// Every settings file at or below `dir`, sorted.
    pub fn list_under(&self, dir: &RelativePath) -> Result<Vec<RelativePath>> {
        let mut files = Vec::new();
        let start = self.locate(dir);
        if start.is_file() {
            files.push(dir.clone());
        } else if start.is_dir() {
            self.walk(dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn walk(&self, dir: &RelativePath, out: &mut Vec<RelativePath>) -> Result<()> {
        let native = self.locate(dir).to_native();
        let entries = fs::read_dir(&native).map_err(|e| Error::io(&native, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&native, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == GIT_DIR {
                continue;
            }
            let child = dir.join(&RelativePath::parse(&name)?);
            let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
            if file_type.is_dir() {
                self.walk(&child, out)?;
            } else {
                out.push(child);
            }
        }
        Ok(())
    }
}
