//! The loader: owns all configuration state and drives the lifecycle.
//!
//! ```text
//! Unloaded --load()--> Loading --ok--> Loaded --reload()--> Reloading --> Loaded
//!     ^                   |
//!     +------- err -------+
//! ```
//!
//! Every operation takes one lock for its whole duration, so `load`, `reload`,
//! `save` and `shutdown` never interleave. Lifecycle hooks and setters run
//! while the lock is held and must not call back into the same loader.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::binding::{BindingRegistry, Manifest};
use crate::bundle::Bundle;
use crate::codec::Gateway;
use crate::error::StashfigError;
use crate::file::{DEFAULT_ROOT, ResourceStore};
use crate::model::{self, ConfigModel, Shared};
use crate::persist;
use crate::report::progress;
use crate::resolve::{InstanceRegistry, Resolver};
use crate::scramble::Scrambler;
use crate::types::{LoaderState, Phase, SaveReport};

/// Handle to a configuration loader. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    manifest: Manifest,
    bundle: Bundle,
    scrambler: Scrambler,
    store: ResourceStore,
    logging: bool,
    state: LoaderState,
    bindings: BindingRegistry,
    instances: InstanceRegistry,
    gateway: Gateway,
    shut_down: bool,
}

impl Loader {
    pub(crate) fn new(manifest: Manifest, bundle: Bundle, root: PathBuf, logging: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                manifest,
                bundle,
                scrambler: Scrambler::default(),
                store: ResourceStore::new(root),
                logging,
                state: LoaderState::Unloaded,
                bindings: BindingRegistry::default(),
                instances: InstanceRegistry::default(),
                gateway: Gateway::default(),
                shut_down: false,
            })),
        }
    }

    /// Discover bindings, resolve every resource and bind the instances.
    ///
    /// Does nothing if the loader has already loaded. On failure the loader
    /// returns to [`LoaderState::Unloaded`] and `load()` may be called again.
    pub fn load(&self) -> Result<(), StashfigError> {
        let mut inner = self.inner.lock();
        if inner.state != LoaderState::Unloaded {
            debug!(target: "stashfig", "load() called on a loaded loader; ignoring");
            return Ok(());
        }

        inner.state = LoaderState::Loading;
        let result = inner.run_load();
        inner.state = if result.is_ok() {
            LoaderState::Loaded
        } else {
            LoaderState::Unloaded
        };
        result
    }

    /// Re-read every resource from disk and rebind the new instances.
    ///
    /// Bindings are not rediscovered. On failure the loader stays loaded and
    /// names not yet reached keep their previous instances.
    pub fn reload(&self) -> Result<(), StashfigError> {
        let mut inner = self.inner.lock();
        if inner.state != LoaderState::Loaded {
            return Err(StashfigError::NotLoaded {
                operation: "reload",
            });
        }

        inner.state = LoaderState::Reloading;
        progress!(inner.logging, "Reloading...");
        let result = inner
            .configure(Phase::Reload)
            .and_then(|()| inner.distribute());
        inner.state = LoaderState::Loaded;
        result
    }

    /// Write every live instance to its resource file.
    pub fn save(&self) -> Result<SaveReport, StashfigError> {
        let mut inner = self.inner.lock();
        if inner.state != LoaderState::Loaded {
            return Err(StashfigError::NotLoaded { operation: "save" });
        }
        Ok(inner.save())
    }

    /// Final save. Runs at most once per loader; later calls return `None`,
    /// as does a loader that never loaded.
    pub fn shutdown(&self) -> Option<SaveReport> {
        let mut inner = self.inner.lock();
        if inner.shut_down {
            return None;
        }
        inner.shut_down = true;
        if inner.state != LoaderState::Loaded {
            return None;
        }

        let report = inner.save();
        if !report.is_complete() {
            warn!(target: "stashfig", "Shutdown save incomplete: {report}");
        }
        Some(report)
    }

    /// A guard that calls [`shutdown`](Self::shutdown) when dropped.
    pub fn save_on_drop(&self) -> SaveGuard {
        SaveGuard {
            loader: self.clone(),
        }
    }

    /// Relocate persisted resources. `None` restores the default `configs`.
    ///
    /// Only allowed before loading has started.
    pub fn set_root_directory(&self, dir: Option<PathBuf>) -> Result<(), StashfigError> {
        let mut inner = self.inner.lock();
        if inner.state != LoaderState::Unloaded {
            return Err(StashfigError::RootDirectoryLocked);
        }
        inner.store = ResourceStore::new(dir.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)));
        Ok(())
    }

    pub fn state(&self) -> LoaderState {
        self.inner.lock().state
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoaderState::Loaded
    }

    pub fn root_directory(&self) -> PathBuf {
        self.inner.lock().store.root().to_path_buf()
    }

    /// File backing a resource under the current root directory.
    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.inner.lock().store.path_for(name)
    }

    /// The shared instance of a resource, if it has been resolved as `M`.
    pub fn instance<M: ConfigModel>(&self, name: &str) -> Option<Shared<M>> {
        let inner = self.inner.lock();
        let live = inner.instances.get(name)?;
        model::downcast::<M>(live.as_ref())
    }
}

impl Inner {
    fn run_load(&mut self) -> Result<(), StashfigError> {
        self.bindings = BindingRegistry::discover(&self.manifest, self.logging)?;

        match self.store.ensure_root() {
            Ok(true) => progress!(
                self.logging,
                "Generated config directory {}",
                self.store.root().display()
            ),
            Ok(false) => progress!(
                self.logging,
                "Using config directory {}",
                self.store.root().display()
            ),
            Err(e) => warn!(target: "stashfig", "{e}"),
        }

        self.configure(Phase::Load)?;
        self.distribute()?;
        progress!(
            self.logging,
            "Loaded {} configuration resource(s)",
            self.instances.len()
        );
        Ok(())
    }

    fn configure(&mut self, phase: Phase) -> Result<(), StashfigError> {
        let mut resolver = Resolver {
            store: &self.store,
            bundle: &self.bundle,
            scrambler: &self.scrambler,
            gateway: &mut self.gateway,
            logging: self.logging,
            phase,
        };
        resolver.configure(self.bindings.plans(), &mut self.instances)
    }

    fn distribute(&self) -> Result<(), StashfigError> {
        progress!(self.logging, "Assigning...");
        for binding in self.bindings.bindings() {
            let live = self
                .instances
                .get(binding.resource())
                .ok_or_else(|| StashfigError::Binding {
                    resource: binding.resource().to_string(),
                    model: binding.model_name(),
                    reason: "resource was never resolved".into(),
                })?;
            binding.assign(live.as_ref())?;
            progress!(
                self.logging,
                " - Assigned '{}' to a {}",
                binding.resource(),
                binding.site_kind()
            );
        }
        Ok(())
    }

    fn save(&mut self) -> SaveReport {
        persist::save_all(
            &self.instances,
            &self.store,
            &self.scrambler,
            &mut self.gateway,
            self.logging,
        )
    }
}

/// Calls [`Loader::shutdown`] on drop.
#[must_use = "the loader saves when this guard is dropped"]
pub struct SaveGuard {
    loader: Loader,
}

impl SaveGuard {
    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.loader.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, Site, Slot};
    use crate::builder::Stashfig;
    use crate::error::BoxError;
    use crate::fixtures::test::{CustomizedConfig, SelfEncodedConfig, TestConfig};
    use crate::model::ModelDescriptor;
    use crate::types::ErrorPolicy;
    use serde::{Deserialize, Serialize};
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_loader(dir: &TempDir) -> (Loader, [Arc<Slot<TestConfig>>; 3]) {
        let slots = [
            Arc::new(Slot::new()),
            Arc::new(Slot::new()),
            Arc::new(Slot::new()),
        ];
        let loader = Stashfig::builder()
            .root_directory(dir.path().join("configs"))
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("test1", &slots[0]))
            .bind(Binding::new("test1", &slots[1]))
            .bind(Binding::new("test2", &slots[2]))
            .build();
        (loader, slots)
    }

    fn bound<M>(slot: &Slot<M>) -> Shared<M> {
        slot.get().unwrap()
    }

    // -- Singleton sharing -------------------------------------------------------

    #[test]
    fn same_name_shares_one_instance() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, b, c]) = test_loader(&dir);
        loader.load().unwrap();

        assert!(Arc::ptr_eq(&bound(&a), &bound(&b)));
        assert!(!Arc::ptr_eq(&bound(&a), &bound(&c)));
        assert!(Arc::ptr_eq(
            &bound(&a),
            &loader.instance::<TestConfig>("test1").unwrap()
        ));

        loader.reload().unwrap();
        assert!(Arc::ptr_eq(&bound(&a), &bound(&b)));
        assert!(!Arc::ptr_eq(&bound(&a), &bound(&c)));
    }

    #[test]
    fn reload_replaces_instances() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, _, _]) = test_loader(&dir);
        loader.load().unwrap();
        let before = bound(&a);

        loader.reload().unwrap();
        assert!(!Arc::ptr_eq(&before, &bound(&a)));
    }

    // -- Persistence ---------------------------------------------------------------

    #[test]
    fn save_then_reload_keeps_changes() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, b, _]) = test_loader(&dir);
        loader.load().unwrap();

        bound(&a).write().num = 5;
        assert_eq!(bound(&b).read().num, 5);
        let report = loader.save().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.saved.len(), 2);

        loader.reload().unwrap();
        assert_eq!(bound(&a).read().num, 5);
        assert_eq!(bound(&b).read().num, 5);
    }

    #[test]
    fn values_survive_a_new_loader() {
        let dir = TempDir::new().unwrap();
        {
            let (loader, [a, _, _]) = test_loader(&dir);
            loader.load().unwrap();
            bound(&a).write().word = "persisted".into();
            loader.shutdown().unwrap();
        }

        let (loader, [a, _, _]) = test_loader(&dir);
        loader.load().unwrap();
        assert_eq!(bound(&a).read().word, "persisted");
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let (loader, [_, _, c]) = test_loader(&dir);
        loader.load().unwrap();

        assert_eq!(bound(&c).read().num, 0);
        assert!(loader.resource_path("test2").is_file());
    }

    #[test]
    fn nested_names_become_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("configs");
        let nested = Arc::new(Slot::<TestConfig>::new());
        let trailing = Arc::new(Slot::<TestConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(&root)
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("myDir/config1", &nested))
            .bind(Binding::new("dir1/dir2/", &trailing))
            .build();

        loader.load().unwrap();
        assert!(root.join("myDir").join("config1.config").is_file());
        assert!(root.join("dir1").join("dir2").join(".config").is_file());

        loader.save().unwrap();
        let text = fs::read_to_string(root.join("myDir").join("config1.config")).unwrap();
        assert!(text.contains("\"num\": 0"));
    }

    #[test]
    fn unreadable_round_trip() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<TestConfig>::new());
        let build = || {
            Stashfig::builder()
                .root_directory(dir.path())
                .logging(false)
                .model(ModelDescriptor::<TestConfig>::json())
                .bind(Binding::new("hidden", &slot).readable(false))
                .build()
        };

        let loader = build();
        loader.load().unwrap();
        bound(&slot).write().word = "secret words".into();
        loader.save().unwrap();

        let raw = fs::read_to_string(dir.path().join("hidden.config")).unwrap();
        assert!(!raw.contains("secret words"));
        assert!(Scrambler::default().inbound(&raw).contains("secret words"));

        let fresh = build();
        fresh.load().unwrap();
        assert_eq!(bound(&slot).read().word, "secret words");
    }

    #[test]
    fn self_codec_round_trip() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<SelfEncodedConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<SelfEncodedConfig>::self_codec())
            .bind(Binding::new("serializer test", &slot))
            .build();

        loader.load().unwrap();
        bound(&slot).write().value = 77;
        loader.save().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("serializer test.config")).unwrap(),
            "value=77"
        );

        bound(&slot).write().value = 0;
        loader.reload().unwrap();
        assert_eq!(bound(&slot).read().value, 77);
    }

    #[test]
    fn customizer_shapes_saved_file() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<CustomizedConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<CustomizedConfig>::json().customize(|b| {
                b.indent(4);
                Ok(())
            }))
            .bind(Binding::new("apply properties", &slot))
            .build();

        loader.load().unwrap();
        bound(&slot).write().label = "x".into();
        loader.save().unwrap();
        let text = fs::read_to_string(dir.path().join("apply properties.config")).unwrap();
        assert!(text.contains("\n    \"label\": \"x\""));
    }

    // -- Default resources -------------------------------------------------------

    #[test]
    fn default_resource_template_seeds_new_file() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<TestConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .bundled("defaults/test.json", r#"{"word": "seeded", "num": 1}"#)
            .model(ModelDescriptor::<TestConfig>::json().default_resource("/defaults/test.json"))
            .bind(Binding::new("default resource test", &slot))
            .build();

        loader.load().unwrap();
        assert_eq!(bound(&slot).read().num, 1);
        assert_eq!(bound(&slot).read().word, "seeded");
    }

    // -- Error policy ------------------------------------------------------------

    fn garbage_loader(dir: &TempDir, policy: ErrorPolicy) -> (Loader, Arc<Slot<TestConfig>>) {
        fs::write(dir.path().join("test1.config"), "certainly { not json").unwrap();
        let slot = Arc::new(Slot::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json().on_error(policy))
            .bind(Binding::new("test1", &slot))
            .build();
        (loader, slot)
    }

    #[test]
    fn garbage_with_throw_fatal_fails_load() {
        let dir = TempDir::new().unwrap();
        let (loader, slot) = garbage_loader(&dir, ErrorPolicy::ThrowFatal);

        let err = loader.load().unwrap_err();
        assert!(matches!(err, StashfigError::Deserialize { .. }));
        assert_eq!(loader.state(), LoaderState::Unloaded);
        assert!(!slot.is_bound());
    }

    #[test]
    fn garbage_with_throw_fatal_fails_reload() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<TestConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("test1", &slot))
            .build();
        loader.load().unwrap();
        let before = bound(&slot);

        fs::write(dir.path().join("test1.config"), "garbage").unwrap();
        assert!(loader.reload().is_err());
        assert_eq!(loader.state(), LoaderState::Loaded);
        assert!(Arc::ptr_eq(&before, &bound(&slot)));
    }

    #[test]
    fn invalid_utf8_with_throw_fatal_keeps_the_file() {
        let dir = TempDir::new().unwrap();
        let (loader, slot) = garbage_loader(&dir, ErrorPolicy::ThrowFatal);
        let corrupt = [0xff, 0xfe, b'{', b'"'];
        fs::write(loader.resource_path("test1"), corrupt).unwrap();

        let err = loader.load().unwrap_err();
        assert!(matches!(err, StashfigError::Deserialize { .. }));
        assert!(!slot.is_bound());
        assert!(loader.shutdown().is_none());
        assert_eq!(fs::read(loader.resource_path("test1")).unwrap(), corrupt);
    }

    #[test]
    fn garbage_with_create_default_yields_default() {
        let dir = TempDir::new().unwrap();
        let (loader, slot) = garbage_loader(&dir, ErrorPolicy::CreateDefault);

        loader.load().unwrap();
        assert_eq!(*bound(&slot).read(), TestConfig::default());
    }

    // -- Lifecycle hooks ---------------------------------------------------------

    static ONCE_CALLS: AtomicUsize = AtomicUsize::new(0);
    static ALWAYS_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Serialize, Deserialize, Default)]
    struct InitOnce {}

    impl ConfigModel for InitOnce {
        fn init(&mut self) -> Result<(), BoxError> {
            ONCE_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Serialize, Deserialize, Default)]
    struct InitAlways {}

    impl ConfigModel for InitAlways {
        fn init(&mut self) -> Result<(), BoxError> {
            ALWAYS_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn hook_timing_follows_reload_policy() {
        let dir = TempDir::new().unwrap();
        let once = Arc::new(Slot::<InitOnce>::new());
        let always = Arc::new(Slot::<InitAlways>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<InitOnce>::json().init_on_reload(false))
            .model(ModelDescriptor::<InitAlways>::json())
            .bind(Binding::new("init once", &once))
            .bind(Binding::new("init always", &always))
            .build();

        loader.load().unwrap();
        assert_eq!(ONCE_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(ALWAYS_CALLS.load(Ordering::SeqCst), 1);

        loader.reload().unwrap();
        assert_eq!(ONCE_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(ALWAYS_CALLS.load(Ordering::SeqCst), 2);
    }

    static HOOK_FAILS: AtomicBool = AtomicBool::new(false);

    #[derive(Serialize, Deserialize, Default)]
    struct Fragile {}

    impl ConfigModel for Fragile {
        fn init(&mut self) -> Result<(), BoxError> {
            if HOOK_FAILS.load(Ordering::SeqCst) {
                return Err("validation failed".into());
            }
            Ok(())
        }
    }

    #[test]
    fn hook_failure_aborts_load_and_reload() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<Fragile>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<Fragile>::json())
            .bind(Binding::new("fragile", &slot))
            .build();

        HOOK_FAILS.store(true, Ordering::SeqCst);
        let err = loader.load().unwrap_err();
        assert!(matches!(err, StashfigError::LifecycleHook { .. }));
        assert!(err.to_string().contains("validation failed"));
        assert!(!loader.is_loaded());

        HOOK_FAILS.store(false, Ordering::SeqCst);
        loader.load().unwrap();
        assert!(loader.is_loaded());

        HOOK_FAILS.store(true, Ordering::SeqCst);
        assert!(loader.reload().is_err());
        assert!(loader.is_loaded());
        HOOK_FAILS.store(false, Ordering::SeqCst);
    }

    // -- Discovery -----------------------------------------------------------------

    #[test]
    fn unregistered_model_binding_is_skipped() {
        let dir = TempDir::new().unwrap();
        let registered = Arc::new(Slot::<TestConfig>::new());
        let orphan = Arc::new(Slot::<CustomizedConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("test1", &registered))
            .bind(Binding::new("orphan", &orphan))
            .build();

        loader.load().unwrap();
        assert!(registered.is_bound());
        assert!(!orphan.is_bound());
        assert!(!loader.resource_path("orphan").exists());
    }

    #[test]
    fn discovery_error_touches_no_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("configs");
        let slot = Arc::new(Slot::<TestConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(&root)
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("test1", &slot))
            .build();

        assert!(matches!(
            loader.load(),
            Err(StashfigError::DuplicateModel { .. })
        ));
        assert!(!root.exists());
    }

    // -- Binding sites -----------------------------------------------------------

    #[test]
    fn static_slot_is_bound() {
        static SETTINGS: Slot<TestConfig> = Slot::new();
        let dir = TempDir::new().unwrap();
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("static", &SETTINGS))
            .build();

        loader.load().unwrap();
        assert!(SETTINGS.is_bound());
    }

    #[test]
    fn dropped_weak_owner_fails_load() {
        let dir = TempDir::new().unwrap();
        let owner = Arc::new(Slot::<TestConfig>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::new("test1", Arc::downgrade(&owner)))
            .build();
        drop(owner);

        assert!(matches!(loader.load(), Err(StashfigError::Binding { .. })));
        assert_eq!(loader.state(), LoaderState::Unloaded);
    }

    #[test]
    fn failing_setter_fails_load() {
        let dir = TempDir::new().unwrap();
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<TestConfig>::json())
            .bind(Binding::<TestConfig>::new(
                "test1",
                Site::setter(|_| Err("site is read-only".into())),
            ))
            .build();

        let err = loader.load().unwrap_err();
        assert!(err.to_string().contains("site is read-only"));
    }

    // -- State machine -------------------------------------------------------------

    #[test]
    fn reload_and_save_require_load() {
        let dir = TempDir::new().unwrap();
        let (loader, _) = test_loader(&dir);

        assert!(matches!(
            loader.reload(),
            Err(StashfigError::NotLoaded { operation: "reload" })
        ));
        assert!(matches!(
            loader.save(),
            Err(StashfigError::NotLoaded { operation: "save" })
        ));
    }

    #[test]
    fn second_load_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, _, _]) = test_loader(&dir);
        loader.load().unwrap();
        let before = bound(&a);

        loader.load().unwrap();
        assert!(Arc::ptr_eq(&before, &bound(&a)));
    }

    #[test]
    fn root_directory_locks_after_load() {
        let dir = TempDir::new().unwrap();
        let (loader, _) = test_loader(&dir);

        loader.set_root_directory(None).unwrap();
        assert_eq!(loader.root_directory(), PathBuf::from("configs"));
        loader
            .set_root_directory(Some(dir.path().join("elsewhere")))
            .unwrap();
        assert_eq!(loader.root_directory(), dir.path().join("elsewhere"));

        loader.load().unwrap();
        assert!(dir.path().join("elsewhere").join("test1.config").is_file());
        assert!(matches!(
            loader.set_root_directory(None),
            Err(StashfigError::RootDirectoryLocked)
        ));
    }

    #[test]
    fn shutdown_saves_once() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, _, _]) = test_loader(&dir);
        loader.load().unwrap();
        bound(&a).write().num = 42;

        let report = loader.shutdown().unwrap();
        assert!(report.saved.contains(&"test1".to_string()));
        assert!(loader.shutdown().is_none());

        let text = fs::read_to_string(loader.resource_path("test1")).unwrap();
        assert!(text.contains("\"num\": 42"));
    }

    #[test]
    fn shutdown_before_load_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let (loader, _) = test_loader(&dir);
        assert!(loader.shutdown().is_none());
        assert!(!loader.resource_path("test1").exists());
    }

    #[test]
    fn save_guard_saves_on_drop() {
        let dir = TempDir::new().unwrap();
        let (loader, [a, _, _]) = test_loader(&dir);
        loader.load().unwrap();
        {
            let guard = loader.save_on_drop();
            assert!(guard.loader().is_loaded());
            bound(&a).write().num = 8;
        }

        let text = fs::read_to_string(loader.resource_path("test1")).unwrap();
        assert!(text.contains("\"num\": 8"));
        assert!(loader.shutdown().is_none());
    }

    // -- Mutual exclusion ----------------------------------------------------------

    static HOOK_ACTIVE: AtomicBool = AtomicBool::new(false);
    static HOOK_ENTRIES: AtomicUsize = AtomicUsize::new(0);
    static ENCODED_DURING_HOOK: AtomicUsize = AtomicUsize::new(0);

    /// Slow hook; encoding records whether it overlapped a running hook.
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Paced {
        ticks: u32,
    }

    impl Serialize for Paced {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::SerializeStruct;

            if HOOK_ACTIVE.load(Ordering::SeqCst) {
                ENCODED_DURING_HOOK.fetch_add(1, Ordering::SeqCst);
            }
            let mut state = serializer.serialize_struct("Paced", 1)?;
            state.serialize_field("ticks", &self.ticks)?;
            state.end()
        }
    }

    impl ConfigModel for Paced {
        fn init(&mut self) -> Result<(), BoxError> {
            HOOK_ACTIVE.store(true, Ordering::SeqCst);
            HOOK_ENTRIES.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(150));
            self.ticks += 1;
            HOOK_ACTIVE.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn save_and_shutdown_wait_for_reload() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(Slot::<Paced>::new());
        let loader = Stashfig::builder()
            .root_directory(dir.path())
            .logging(false)
            .model(ModelDescriptor::<Paced>::json())
            .bind(Binding::new("paced", &slot))
            .build();
        loader.load().unwrap();
        loader.save().unwrap();
        let entries = HOOK_ENTRIES.load(Ordering::SeqCst);

        let reloader = {
            let loader = loader.clone();
            std::thread::spawn(move || loader.reload())
        };
        while HOOK_ENTRIES.load(Ordering::SeqCst) == entries {
            std::thread::yield_now();
        }

        let report = loader.save().unwrap();
        assert!(report.is_complete());
        assert!(loader.shutdown().unwrap().is_complete());
        reloader.join().unwrap().unwrap();

        assert_eq!(ENCODED_DURING_HOOK.load(Ordering::SeqCst), 0);
        assert_eq!(bound(&slot).read().ticks, 2);
        let text = fs::read_to_string(loader.resource_path("paced")).unwrap();
        assert!(text.contains("\"ticks\": 2"), "{text}");
    }

    #[test]
    fn clones_share_state() {
        let dir = TempDir::new().unwrap();
        let (loader, _) = test_loader(&dir);
        let other = loader.clone();
        loader.load().unwrap();
        assert!(other.is_loaded());
    }
}
