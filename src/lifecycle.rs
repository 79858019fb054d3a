//! Post-construction hook policy.
//!
//! [`ConfigModel::init`](crate::ConfigModel::init) runs after every load of an
//! instance. On reload it runs only if the model's descriptor allows it.

use crate::error::StashfigError;
use crate::model::{Live, ModelEntry};
use crate::types::Phase;

/// Whether the hook of `model` runs in `phase`.
pub fn should_run(model: &dyn ModelEntry, phase: Phase) -> bool {
    match phase {
        Phase::Load => true,
        Phase::Reload => model.runs_init_on_reload(),
    }
}

/// Run the hook on a freshly obtained instance. Returns whether it ran.
pub fn post_construct(
    resource: &str,
    model: &dyn ModelEntry,
    live: &dyn Live,
    phase: Phase,
) -> Result<bool, StashfigError> {
    if !should_run(model, phase) {
        return Ok(false);
    }
    live.run_init().map_err(|source| StashfigError::LifecycleHook {
        resource: resource.to_string(),
        model: model.model_name(),
        source,
    })?;
    Ok(true)
}
