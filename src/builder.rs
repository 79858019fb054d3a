use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::binding::{Binding, Manifest};
use crate::bundle::Bundle;
use crate::error::StashfigError;
use crate::file::{self, DEFAULT_ROOT};
use crate::loader::Loader;
use crate::model::{ConfigModel, ModelDescriptor};
use crate::settings::LoaderSettings;

/// Entry point for building a configuration loader.
pub struct Stashfig;

impl Stashfig {
    pub fn builder() -> StashfigBuilder {
        StashfigBuilder::new()
    }
}

/// Builder that assembles the registration manifest.
///
/// Models are registered with [`model()`](Self::model), call sites with
/// [`bind()`](Self::bind). Nothing is discovered or read until
/// [`Loader::load`] runs, so registration order does not matter.
pub struct StashfigBuilder {
    root_directory: PathBuf,
    logging: bool,
    auto_load: bool,
    manifest: Manifest,
    bundle: Bundle,
}

impl StashfigBuilder {
    fn new() -> Self {
        Self {
            root_directory: PathBuf::from(DEFAULT_ROOT),
            logging: true,
            auto_load: true,
            manifest: Manifest::default(),
            bundle: Bundle::new(),
        }
    }

    /// Directory holding persisted resources (default: `configs`, relative to
    /// the working directory).
    pub fn root_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_directory = dir.into();
        self
    }

    /// Use the per-user platform directory of `app_name` as the root.
    /// Keeps the current root if the platform directory is unknown.
    pub fn platform_root(mut self, app_name: &str) -> Self {
        match file::platform_root(app_name) {
            Some(dir) => self.root_directory = dir,
            None => warn!(
                target: "stashfig",
                "No platform config directory for '{app_name}'; keeping {}",
                self.root_directory.display()
            ),
        }
        self
    }

    /// Enable or disable progress logging (default: `true`).
    pub fn logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Whether [`start()`](Self::start) loads immediately (default: `true`).
    pub fn auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// Apply resolved [`LoaderSettings`].
    pub fn settings(self, settings: &LoaderSettings) -> Self {
        self.root_directory(settings.root_directory.clone())
            .logging(settings.logging)
            .auto_load(settings.auto_load_on_startup)
    }

    /// Register a model type.
    pub fn model<M: ConfigModel>(mut self, descriptor: ModelDescriptor<M>) -> Self {
        self.manifest.models.push(Arc::new(descriptor));
        self
    }

    /// Register a binding. Bindings whose model type is never registered are
    /// skipped at load time.
    pub fn bind<M: ConfigModel>(mut self, binding: Binding<M>) -> Self {
        self.manifest.bindings.push(Arc::new(binding));
        self
    }

    /// Replace the namespace default resources are looked up in.
    pub fn bundle(mut self, bundle: Bundle) -> Self {
        self.bundle = bundle;
        self
    }

    /// Add one in-memory default resource.
    pub fn bundled(mut self, path: &str, content: impl Into<Cow<'static, str>>) -> Self {
        self.bundle.insert(path, content);
        self
    }

    pub fn build(self) -> Loader {
        Loader::new(self.manifest, self.bundle, self.root_directory, self.logging)
    }

    /// Build the loader and load it if auto-loading is on.
    pub fn start(self) -> Result<Loader, StashfigError> {
        let auto_load = self.auto_load;
        let loader = self.build();
        if auto_load {
            loader.load()?;
        }
        Ok(loader)
    }
}
