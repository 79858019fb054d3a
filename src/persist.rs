//! Save routine: encode, transform and write every live instance.
//!
//! A failure on one resource is logged and recorded in the [`SaveReport`];
//! the remaining resources are still written. Codec settings come from the
//! gateway's cache, so customizers do not run again between cycles.

use std::path::PathBuf;

use tracing::error;

use crate::codec::Gateway;
use crate::error::StashfigError;
use crate::file::ResourceStore;
use crate::report::progress;
use crate::resolve::{Entry, InstanceRegistry};
use crate::scramble::Scrambler;
use crate::types::SaveReport;

pub(crate) fn save_all(
    registry: &InstanceRegistry,
    store: &ResourceStore,
    scrambler: &Scrambler,
    gateway: &mut Gateway,
    logging: bool,
) -> SaveReport {
    progress!(logging, "Saving...");
    let mut report = SaveReport::default();
    for (name, entry) in registry.iter() {
        match save_one(name, entry, store, scrambler, gateway) {
            Ok(path) => {
                progress!(logging, " - Saved '{name}' to {}", path.display());
                report.saved.push(name.to_string());
            }
            Err(e) => {
                error!(target: "stashfig", "Failed to save '{name}': {e}");
                report.failed.push((name.to_string(), e.to_string()));
            }
        }
    }
    report
}

fn save_one(
    name: &str,
    entry: &Entry,
    store: &ResourceStore,
    scrambler: &Scrambler,
    gateway: &mut Gateway,
) -> Result<PathBuf, StashfigError> {
    let settings = gateway.settings_for(entry.model.as_ref())?;
    let text = entry
        .live
        .encode(&settings)
        .map_err(|e| StashfigError::Serialize {
            resource: name.to_string(),
            reason: e.to_string(),
        })?;
    let text = if entry.readable {
        text
    } else {
        scrambler.outbound(&text)
    };
    store.write(name, &text)
}
