use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by user callbacks: lifecycle hooks, self codecs,
/// customizers and setters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StashfigError {
    #[error("Model '{model}' is registered more than once")]
    DuplicateModel { model: &'static str },

    #[error("Resource '{resource}' is bound to both '{first}' and '{second}'")]
    ConflictingModels {
        resource: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Resource '{resource}' is declared both readable and unreadable")]
    ConflictingReadability { resource: String },

    #[error("Invalid resource name '{resource}': {reason}")]
    InvalidResourceName { resource: String, reason: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not load resource '{resource}' as '{model}': {reason}")]
    Deserialize {
        resource: String,
        model: &'static str,
        reason: String,
    },

    #[error("Could not load default for resource '{resource}' as '{model}' from '{template}'")]
    MissingDefault {
        resource: String,
        model: &'static str,
        template: String,
    },

    #[error("The init hook of '{model}' failed for resource '{resource}': {source}")]
    LifecycleHook {
        resource: String,
        model: &'static str,
        source: BoxError,
    },

    #[error("Cannot bind resource '{resource}' of type '{model}': {reason}")]
    Binding {
        resource: String,
        model: &'static str,
        reason: String,
    },

    #[error("Serializer customization for '{model}' rejected: {reason}")]
    Customization { model: &'static str, reason: String },

    #[error("Could not encode resource '{resource}': {reason}")]
    Serialize { resource: String, reason: String },

    #[error("Cannot {operation} configurations before they have been loaded; call .load() first")]
    NotLoaded { operation: &'static str },

    #[error("Cannot change the root directory after the loader has started loading")]
    RootDirectoryLocked,

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),

    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] toml::de::Error),
}

impl StashfigError {
    /// Whether this error aborts the operation that raised it.
    ///
    /// I/O failures and save-time encode failures are recovered per resource;
    /// everything else ends the current load, reload or save.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Serialize { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
