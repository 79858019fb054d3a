//! Progress logging.
//!
//! Informational progress is emitted only when the loader's logging flag is
//! on. Warnings and errors go through `tracing` directly and are never
//! suppressed.

/// `tracing::info!` under the `stashfig` target, gated by a runtime flag.
macro_rules! progress {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!(target: "stashfig", $($arg)+);
        }
    };
}

pub(crate) use progress;
