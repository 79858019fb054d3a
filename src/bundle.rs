//! Read-only namespace of default-resource templates.
//!
//! Templates are looked up by an opaque path string, the same way a model's
//! `default_resource` names them. Entries registered in memory (usually with
//! `include_str!`) win over files under the optional template directory. A
//! leading `/` is ignored so absolute-looking references still match.
//!
//! Nothing here is ever written to.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StashfigError;

#[derive(Debug, Clone, Default)]
pub struct Bundle {
    entries: HashMap<String, Cow<'static, str>>,
    dir: Option<PathBuf>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look templates up under `dir` when no in-memory entry matches.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: HashMap::new(),
            dir: Some(dir.into()),
        }
    }

    /// Add an in-memory template.
    pub fn with(mut self, path: &str, content: impl Into<Cow<'static, str>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: impl Into<Cow<'static, str>>) {
        self.entries.insert(normalize(path).to_string(), content.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dir.is_none()
    }

    /// Fetch a template. `Ok(None)` means it does not exist.
    pub fn open(&self, path: &str) -> Result<Option<Cow<'_, str>>, StashfigError> {
        let key = normalize(path);
        if let Some(content) = self.entries.get(key) {
            return Ok(Some(Cow::Borrowed(content.as_ref())));
        }

        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let file_path = dir.join(key);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => Ok(Some(Cow::Owned(content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StashfigError::io(file_path, e)),
        }
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}
