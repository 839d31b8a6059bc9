//! Settings paths and their on-disk locations

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name of the git database directory, never addressable as settings content.
pub const GIT_DIR: &str = ".git";

/// Absolute or working-directory path stored with forward slashes.
///
/// Converted back to a native [`PathBuf`] only where the filesystem is
/// touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append `segment`, which may itself contain several components.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        match (self.inner.ends_with('/'), segment.is_empty()) {
            (_, true) => self.clone(),
            (true, false) => Self {
                inner: format!("{}{}", self.inner, segment),
            },
            (false, false) => Self {
                inner: format!("{}/{}", self.inner, segment),
            },
        }
    }

    /// Location of a settings path below this root.
    pub fn resolve(&self, relative: &RelativePath) -> Self {
        self.join(relative.as_str())
    }

    /// Last component, ignoring a trailing slash.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.trim_end_matches('/').rsplit('/').next()
    }

    /// Text after the last dot of the file name; dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// A validated path relative to the settings root.
///
/// Uses forward slashes, has no `.`/`..` segments, is never absolute and
/// never points into the git database. The empty path denotes the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath {
    inner: String,
}

impl RelativePath {
    /// The settings root.
    pub fn root() -> Self {
        Self {
            inner: String::new(),
        }
    }

    /// Validate and normalize a settings path.
    pub fn parse(path: &str) -> Result<Self> {
        let normalized = path.replace('\\', "/");

        if normalized.starts_with('/') || has_drive_prefix(&normalized) {
            return Err(Error::invalid_path(path, "absolute paths are not allowed"));
        }

        let mut segments = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::invalid_path(path, "parent segments are not allowed"));
                }
                _ => segments.push(segment),
            }
        }

        if segments.first().is_some_and(|first| *first == GIT_DIR) {
            return Err(Error::invalid_path(path, "the git database is not settings content"));
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// True for the settings root.
    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Join a further relative segment.
    pub fn join(&self, other: &RelativePath) -> Self {
        if self.is_root() {
            return other.clone();
        }
        if other.is_root() {
            return self.clone();
        }
        Self {
            inner: format!("{}/{}", self.inner, other.inner),
        }
    }

    /// Check whether `self` equals `dir` or lies below it.
    pub fn is_within(&self, dir: &RelativePath) -> bool {
        dir.is_root()
            || self.inner == dir.inner
            || self
                .inner
                .strip_prefix(&dir.inner)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.inner.rfind('/') {
            Some(idx) => Self {
                inner: self.inner[..idx].to_string(),
            },
            None => Self::root(),
        })
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
