//! Manifest validation run during the setup phase.
//!
//! Rejects registrations a single-table store cannot honor: a model type
//! registered twice, one resource bound to two model types or with two
//! readability flags, and resource names that would leave the root directory.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StashfigError;
use crate::model::ModelEntry;

/// Index descriptors by model type, rejecting duplicates.
pub fn index_models(
    models: &[Arc<dyn ModelEntry>],
) -> Result<HashMap<TypeId, Arc<dyn ModelEntry>>, StashfigError> {
    let mut index = HashMap::with_capacity(models.len());
    for model in models {
        if index
            .insert(model.model_type(), Arc::clone(model))
            .is_some()
        {
            return Err(StashfigError::DuplicateModel {
                model: model.model_name(),
            });
        }
    }
    Ok(index)
}

/// A resource name must stay inside the root directory.
pub fn validate_resource_name(name: &str) -> Result<(), StashfigError> {
    let invalid = |reason: &str| StashfigError::InvalidResourceName {
        resource: name.to_string(),
        reason: reason.to_string(),
    };

    if name.contains('\0') {
        return Err(invalid("contains a NUL character"));
    }
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(invalid("'..' segments would escape the root directory"));
    }
    if name.split(['/', '\\']).next().is_some_and(|first| first.ends_with(':')) {
        return Err(invalid("drive prefixes are not allowed"));
    }
    Ok(())
}

/// Two bindings of one resource must agree on model type and readability.
pub fn check_same_resource(
    resource: &str,
    existing: (&'static str, TypeId, bool),
    incoming: (&'static str, TypeId, bool),
) -> Result<(), StashfigError> {
    let (first, first_type, first_readable) = existing;
    let (second, second_type, second_readable) = incoming;

    if first_type != second_type {
        return Err(StashfigError::ConflictingModels {
            resource: resource.to_string(),
            first,
            second,
        });
    }
    if first_readable != second_readable {
        return Err(StashfigError::ConflictingReadability {
            resource: resource.to_string(),
        });
    }
    Ok(())
}
