//! Bindings: where resolved instances are delivered.
//!
//! A [`Binding`] ties a resource name to a [`Site`], the process-wide place
//! that receives the shared instance. The usual site is a `static`
//! [`Slot`]:
//!
//! ```ignore
//! static SETTINGS: Slot<Settings> = Slot::new();
//!
//! let loader = Stashfig::builder()
//!     .model(ModelDescriptor::<Settings>::json())
//!     .bind(Binding::new("settings", &SETTINGS))
//!     .build();
//! ```
//!
//! During setup the [`BindingRegistry`] keeps every binding whose model type
//! has a registered descriptor and groups them by resource name. Bindings of
//! unregistered types are skipped, never an error.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{BoxError, StashfigError};
use crate::model::{self, ConfigModel, Live, ModelEntry, Shared};
use crate::report::progress;
use crate::validate;

/// A process-wide cell holding the instance bound to it.
pub struct Slot<M> {
    cell: RwLock<Option<Shared<M>>>,
}

impl<M> Slot<M> {
    pub const fn new() -> Self {
        Self {
            cell: RwLock::new(None),
        }
    }

    /// The bound instance, if any.
    pub fn get(&self) -> Option<Shared<M>> {
        self.cell.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.read().is_some()
    }

    /// Drop the slot's reference. The next load or reload binds it again.
    pub fn clear(&self) {
        *self.cell.write() = None;
    }

    fn set(&self, shared: Shared<M>) {
        *self.cell.write() = Some(shared);
    }
}

impl<M> Default for Slot<M> {
    fn default() -> Self {
        Self::new()
    }
}

type Setter<M> = Box<dyn Fn(Shared<M>) -> Result<(), BoxError> + Send + Sync>;

/// Where a binding delivers its instance.
pub enum Site<M: 'static> {
    /// A `static` slot.
    Static(&'static Slot<M>),
    /// A slot shared through an `Arc`.
    Handle(Arc<Slot<M>>),
    /// A slot owned by something that may be dropped. Binding fails once the
    /// owner is gone.
    Weak(Weak<Slot<M>>),
    /// A caller-supplied setter.
    Setter(Setter<M>),
}

impl<M: 'static> Site<M> {
    pub fn setter<F>(f: F) -> Self
    where
        F: Fn(Shared<M>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::Setter(Box::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Static(_) => "static slot",
            Self::Handle(_) => "slot handle",
            Self::Weak(_) => "weak slot",
            Self::Setter(_) => "setter",
        }
    }

    fn assign(&self, shared: Shared<M>) -> Result<(), String> {
        match self {
            Self::Static(slot) => slot.set(shared),
            Self::Handle(slot) => slot.set(shared),
            Self::Weak(weak) => match weak.upgrade() {
                Some(slot) => slot.set(shared),
                None => return Err("the slot's owner was dropped".into()),
            },
            Self::Setter(set) => set(shared).map_err(|e| e.to_string())?,
        }
        Ok(())
    }
}

impl<M: 'static> From<&'static Slot<M>> for Site<M> {
    fn from(slot: &'static Slot<M>) -> Self {
        Self::Static(slot)
    }
}

impl<M: 'static> From<Arc<Slot<M>>> for Site<M> {
    fn from(slot: Arc<Slot<M>>) -> Self {
        Self::Handle(slot)
    }
}

impl<M: 'static> From<&Arc<Slot<M>>> for Site<M> {
    fn from(slot: &Arc<Slot<M>>) -> Self {
        Self::Handle(Arc::clone(slot))
    }
}

impl<M: 'static> From<Weak<Slot<M>>> for Site<M> {
    fn from(slot: Weak<Slot<M>>) -> Self {
        Self::Weak(slot)
    }
}

/// A declared association between a site and a named resource.
pub struct Binding<M: 'static> {
    resource: String,
    readable: bool,
    site: Site<M>,
}

impl<M: ConfigModel> Binding<M> {
    pub fn new(resource: impl Into<String>, site: impl Into<Site<M>>) -> Self {
        Self {
            resource: resource.into(),
            readable: true,
            site: site.into(),
        }
    }

    /// Whether the file is stored as plain text (default: `true`). Unreadable
    /// resources go through the [`Scrambler`](crate::scramble::Scrambler).
    pub fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }
}

/// Type-erased view of a [`Binding`].
pub(crate) trait SiteBinding: Send + Sync {
    fn resource(&self) -> &str;
    fn is_readable(&self) -> bool;
    fn model_type(&self) -> TypeId;
    fn model_name(&self) -> &'static str;
    fn site_kind(&self) -> &'static str;
    fn assign(&self, live: &dyn Live) -> Result<(), StashfigError>;
}

impl<M: ConfigModel> SiteBinding for Binding<M> {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn is_readable(&self) -> bool {
        self.readable
    }

    fn model_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn model_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn site_kind(&self) -> &'static str {
        self.site.kind()
    }

    fn assign(&self, live: &dyn Live) -> Result<(), StashfigError> {
        let binding_error = |reason: String| StashfigError::Binding {
            resource: self.resource.clone(),
            model: self.model_name(),
            reason,
        };
        let shared = model::downcast::<M>(live)
            .ok_or_else(|| binding_error("resolved instance has a different type".into()))?;
        self.site.assign(shared).map_err(binding_error)
    }
}

/// Everything registered on the builder, before discovery.
#[derive(Clone, Default)]
pub(crate) struct Manifest {
    pub models: Vec<Arc<dyn ModelEntry>>,
    pub bindings: Vec<Arc<dyn SiteBinding>>,
}

/// One resource to resolve: its name, model and storage format.
#[derive(Clone)]
pub(crate) struct ResourcePlan {
    pub name: String,
    pub model: Arc<dyn ModelEntry>,
    pub readable: bool,
}

/// Bindings kept by discovery, grouped by resource name.
#[derive(Default)]
pub(crate) struct BindingRegistry {
    plans: BTreeMap<String, ResourcePlan>,
    bindings: Vec<Arc<dyn SiteBinding>>,
}

impl BindingRegistry {
    /// Setup phase. Pure: no I/O.
    pub fn discover(manifest: &Manifest, logging: bool) -> Result<Self, StashfigError> {
        progress!(logging, "Setting up...");
        let models = validate::index_models(&manifest.models)?;
        for model in models.values() {
            crate::codec::check_customizer(model.as_ref())?;
            progress!(logging, " - Found configuration model: {}", model.model_name());
        }

        let mut registry = Self::default();
        for binding in &manifest.bindings {
            let Some(model) = models.get(&binding.model_type()) else {
                tracing::debug!(
                    target: "stashfig",
                    "Skipping binding of '{}': no model registered for {}",
                    binding.resource(),
                    binding.model_name()
                );
                continue;
            };
            validate::validate_resource_name(binding.resource())?;

            match registry.plans.entry(binding.resource().to_string()) {
                Entry::Occupied(existing) => {
                    let plan = existing.get();
                    validate::check_same_resource(
                        &plan.name,
                        (plan.model.model_name(), plan.model.model_type(), plan.readable),
                        (binding.model_name(), binding.model_type(), binding.is_readable()),
                    )?;
                }
                Entry::Vacant(slot) => {
                    slot.insert(ResourcePlan {
                        name: binding.resource().to_string(),
                        model: Arc::clone(model),
                        readable: binding.is_readable(),
                    });
                }
            }

            progress!(
                logging,
                " - Found configuration binding: '{}' ({}) into a {}",
                binding.resource(),
                binding.model_name(),
                binding.site_kind()
            );
            registry.bindings.push(Arc::clone(binding));
        }
        Ok(registry)
    }

    pub fn plans(&self) -> impl Iterator<Item = &ResourcePlan> {
        self.plans.values()
    }

    #[cfg(test)]
    pub fn plan(&self, name: &str) -> Option<&ResourcePlan> {
        self.plans.get(name)
    }

    pub fn bindings(&self) -> &[Arc<dyn SiteBinding>] {
        &self.bindings
    }
}
