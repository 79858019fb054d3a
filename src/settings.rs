//! Loader settings, resolved with confique.
//!
//! Layers, lowest priority first: compiled defaults, a TOML file, then
//! `STASHFIG_*` environment variables.
//!
//! ```toml
//! root_directory = "/var/lib/myapp/configs"
//! logging = false
//! auto_load_on_startup = true
//! ```

use std::path::{Path, PathBuf};

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::StashfigError;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Directory holding persisted resources.
    #[config(default = "configs", env = "STASHFIG_ROOT_DIRECTORY")]
    pub root_directory: PathBuf,

    /// Emit progress messages while loading, reloading and saving.
    #[config(default = true, env = "STASHFIG_LOGGING")]
    pub logging: bool,

    /// Whether `StashfigBuilder::start()` loads immediately.
    #[config(default = true, env = "STASHFIG_AUTO_LOAD")]
    pub auto_load_on_startup: bool,
}

impl LoaderSettings {
    /// Settings from `path` (if it exists) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, StashfigError> {
        Ok(Self::builder().env().file(path.as_ref()).load()?)
    }

    /// Settings from a TOML string, with compiled defaults filling the gaps.
    /// The environment is not consulted.
    pub fn from_toml(text: &str) -> Result<Self, StashfigError> {
        let layer: <Self as Config>::Layer = toml::from_str(text)?;
        Ok(Self::builder().preloaded(layer).load()?)
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            root_directory: PathBuf::from(crate::file::DEFAULT_ROOT),
            logging: true,
            auto_load_on_startup: true,
        }
    }
}
