//! Configure phase: resolve every planned resource to one live instance.
//!
//! For each resource name, exactly once per cycle:
//!
//! 1. Ensure the file exists (directories plus an empty file). I/O failures are
//!    logged and resolution continues in memory.
//! 2. Missing or blank file: use the model's default template if it has one,
//!    otherwise `M::default()`.
//! 3. Stored content: undo the transform for unreadable resources, then decode.
//!    A decode failure falls back to the template first, then to the model's
//!    [`ErrorPolicy`].
//! 4. Run the lifecycle hook for the current [`Phase`].
//! 5. Cache the instance under the resource name, replacing the previous one.
//!
//! A fatal error stops the cycle. Names resolved before it keep their new
//! instances; names not reached keep the previous cycle's.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::binding::ResourcePlan;
use crate::bundle::Bundle;
use crate::codec::{CodecSettings, Gateway};
use crate::error::StashfigError;
use crate::file::{Content, ResourceStore};
use crate::lifecycle;
use crate::model::{Live, ModelEntry};
use crate::report::progress;
use crate::scramble::Scrambler;
use crate::types::{ErrorPolicy, Phase};

/// A cached instance with what `save()` needs to persist it.
pub(crate) struct Entry {
    pub live: Arc<dyn Live>,
    pub model: Arc<dyn ModelEntry>,
    pub readable: bool,
}

/// Resource name to its current instance.
#[derive(Default)]
pub(crate) struct InstanceRegistry {
    entries: BTreeMap<String, Entry>,
}

impl InstanceRegistry {
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Live>> {
        self.entries.get(name).map(|entry| &entry.live)
    }

    pub fn insert(&mut self, name: String, entry: Entry) {
        self.entries.insert(name, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Everything one configure cycle reads from.
pub(crate) struct Resolver<'a> {
    pub store: &'a ResourceStore,
    pub bundle: &'a Bundle,
    pub scrambler: &'a Scrambler,
    pub gateway: &'a mut Gateway,
    pub logging: bool,
    pub phase: Phase,
}

impl Resolver<'_> {
    pub fn configure<'p>(
        &mut self,
        plans: impl IntoIterator<Item = &'p ResourcePlan>,
        registry: &mut InstanceRegistry,
    ) -> Result<(), StashfigError> {
        progress!(self.logging, "Configuring...");
        self.gateway.begin_cycle();
        for plan in plans {
            let live = self.resolve(plan)?;
            registry.insert(
                plan.name.clone(),
                Entry {
                    live,
                    model: Arc::clone(&plan.model),
                    readable: plan.readable,
                },
            );
        }
        Ok(())
    }

    /// Resolve a single resource.
    pub fn resolve(&mut self, plan: &ResourcePlan) -> Result<Arc<dyn Live>, StashfigError> {
        let name = plan.name.as_str();
        let model = plan.model.as_ref();
        let settings = self.gateway.settings_for(model)?;

        match self.store.ensure(name) {
            Ok((path, true)) => progress!(self.logging, " - Generated file {}", path.display()),
            Ok(_) => {}
            Err(e) => warn!(target: "stashfig", "{e}; '{name}' will only live in memory"),
        }

        let content = self.store.read(name).unwrap_or_else(|e| {
            warn!(target: "stashfig", "{e}; treating '{name}' as missing");
            Content::Absent
        });

        let live = match content {
            Content::Absent | Content::Empty => self.create(plan, &settings, None)?,
            Content::Corrupt(reason) => {
                warn!(target: "stashfig", "Stored '{name}' is not valid text: {reason}");
                self.create(plan, &settings, Some(reason))?
            }
            Content::Present(raw) => {
                let text = if plan.readable {
                    raw
                } else {
                    self.scrambler.inbound(&raw)
                };
                match model.decode(&text, &settings) {
                    Ok(live) => {
                        progress!(self.logging, " - Loaded '{name}'");
                        live
                    }
                    Err(e) => {
                        warn!(
                            target: "stashfig",
                            "Could not decode '{name}' as '{}': {e}",
                            model.model_name()
                        );
                        self.create(plan, &settings, Some(e.to_string()))?
                    }
                }
            }
        };

        if lifecycle::post_construct(name, model, live.as_ref(), self.phase)? {
            progress!(self.logging, " - Initialized '{name}'");
        }
        Ok(live)
    }

    /// Default/create policy. `decode_failure` is set when stored content
    /// existed but could not be decoded.
    fn create(
        &self,
        plan: &ResourcePlan,
        settings: &CodecSettings,
        decode_failure: Option<String>,
    ) -> Result<Arc<dyn Live>, StashfigError> {
        let name = plan.name.as_str();
        let model = plan.model.as_ref();

        let Some(template) = model.template_path() else {
            return match (model.error_policy(), decode_failure) {
                (ErrorPolicy::ThrowFatal, Some(reason)) => Err(StashfigError::Deserialize {
                    resource: name.to_string(),
                    model: model.model_name(),
                    reason,
                }),
                _ => {
                    progress!(self.logging, " - Generated '{name}' with default values");
                    Ok(model.fresh())
                }
            };
        };

        if let Some(live) = self.from_template(name, model, template, settings) {
            progress!(self.logging, " - Generated '{name}' from '{template}'");
            return Ok(live);
        }

        match model.error_policy() {
            ErrorPolicy::CreateDefault => {
                progress!(self.logging, " - Generated '{name}' with default values");
                Ok(model.fresh())
            }
            ErrorPolicy::ThrowFatal => Err(StashfigError::MissingDefault {
                resource: name.to_string(),
                model: model.model_name(),
                template: template.to_string(),
            }),
        }
    }

    fn from_template(
        &self,
        name: &str,
        model: &dyn ModelEntry,
        template: &str,
        settings: &CodecSettings,
    ) -> Option<Arc<dyn Live>> {
        let text = match self.bundle.open(template) {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(target: "stashfig", "Default '{template}' for '{name}' is missing or empty");
                return None;
            }
            Err(e) => {
                warn!(target: "stashfig", "{e}");
                return None;
            }
        };
        model
            .decode(&text, settings)
            .inspect_err(|e| warn!(target: "stashfig", "Could not decode default '{template}': {e}"))
            .ok()
    }
}
