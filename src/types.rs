use std::fmt;

/// What happens when a resource cannot be deserialized and no usable default
/// template exists for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Fall back to a freshly default-constructed instance.
    CreateDefault,
    /// Abort the load or reload with an error naming the resource and model.
    #[default]
    ThrowFatal,
}

/// Lifecycle state of a [`Loader`](crate::Loader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Unloaded,
    Loading,
    Loaded,
    Reloading,
}

/// Which kind of configure cycle is running. Decides whether lifecycle hooks
/// of models with `init_on_reload = false` are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Load,
    Reload,
}

/// Outcome of a [`Loader::save`](crate::Loader::save) call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Resource names written successfully.
    pub saved: Vec<String>,
    /// Resource names that could not be written, with the reason.
    pub failed: Vec<(String, String)>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Saved {} resource(s)", self.saved.len())?;
        for (name, reason) in &self.failed {
            write!(f, "\nFailed to save '{name}': {reason}")?;
        }
        Ok(())
    }
}
