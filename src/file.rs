//! Resource store: maps resource names to files under the root directory.
//!
//! A resource named `name` lives at `{root}/{name}.config`. Both `/` and `\`
//! separate directory segments, so `myDir/config1` becomes
//! `{root}/myDir/config1.config`. A name ending in a separator yields a file
//! literally named `.config` in the last directory: `dir1/dir2/` becomes
//! `{root}/dir1/dir2/.config`. Empty segments are skipped.
//!
//! Every I/O failure is returned to the caller as
//! [`StashfigError::Io`]; the resolver decides whether it is fatal.

use std::path::{Path, PathBuf};

use crate::error::StashfigError;

pub const EXTENSION: &str = "config";

/// Default root directory, relative to the working directory.
pub const DEFAULT_ROOT: &str = "configs";

/// What a resource file currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Absent,
    /// The file exists but holds nothing but whitespace.
    Empty,
    Present(String),
    /// The file exists but is not valid UTF-8. Holds the reason.
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of a resource. Pure, no I/O.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut segments: Vec<&str> = name.split(['/', '\\']).collect();
        let leaf = segments.pop().unwrap_or_default();

        let mut path = self.root.clone();
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{leaf}.{EXTENSION}"));
        path
    }

    /// Create the root directory if needed. Returns `true` if it was created.
    pub fn ensure_root(&self) -> Result<bool, StashfigError> {
        if self.root.is_dir() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.root).map_err(|e| StashfigError::io(&self.root, e))?;
        Ok(true)
    }

    /// Create the resource's directories and an empty file if it does not exist
    /// yet. Returns the path and whether the file was created.
    pub fn ensure(&self, name: &str) -> Result<(PathBuf, bool), StashfigError> {
        let path = self.path_for(name);
        if path.exists() {
            return Ok((path, false));
        }

        create_parent_dirs(&path)?;
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok((path, true)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok((path, false)),
            Err(e) => Err(StashfigError::io(path, e)),
        }
    }

    pub fn read(&self, name: &str) -> Result<Content, StashfigError> {
        let path = self.path_for(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Content::Absent),
            Err(e) => return Err(StashfigError::io(path, e)),
        };
        Ok(match String::from_utf8(bytes) {
            Ok(content) if content.trim().is_empty() => Content::Empty,
            Ok(content) => Content::Present(content),
            Err(e) => Content::Corrupt(e.utf8_error().to_string()),
        })
    }

    /// Write a resource, creating parent directories as needed.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf, StashfigError> {
        let path = self.path_for(name);
        create_parent_dirs(&path)?;
        std::fs::write(&path, content).map_err(|e| StashfigError::io(&path, e))?;
        Ok(path)
    }
}

fn create_parent_dirs(path: &Path) -> Result<(), StashfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StashfigError::io(parent, e))?;
    }
    Ok(())
}

/// Per-user root directory: `{platform config dir}/configs`.
///
/// Returns `None` if the platform directory cannot be determined (e.g. no
/// home directory).
pub fn platform_root(app_name: &str) -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", app_name)?;
    Some(proj.config_dir().join(DEFAULT_ROOT))
}
