//! Typed configuration objects that persist to disk across restarts.
//!
//! Stashfig keeps one shared instance per named resource, binds it into every
//! place that declared it, and writes it back on save. Think of it as a
//! single-table key-value store where each value is a typed struct and each
//! key is a file under a root directory.
//!
//! ```ignore
//! static SETTINGS: Slot<AppSettings> = Slot::new();
//!
//! let loader = Stashfig::builder()
//!     .model(ModelDescriptor::<AppSettings>::json())
//!     .bind(Binding::new("app/settings", &SETTINGS))
//!     .start()?;
//!
//! SETTINGS.get().unwrap().write().volume = 7;
//! loader.save()?;
//! ```
//!
//! That stores the instance at `configs/app/settings.config` and hands the same
//! `Arc` to every binding of `"app/settings"`.
//!
//! # Registration instead of discovery
//!
//! There is no scanning. The host registers two things on the builder:
//!
//! - **Models** ([`ModelDescriptor`]): one per type, carrying the codec, the
//!   default template, the [`ErrorPolicy`] and the reload-hook policy.
//! - **Bindings** ([`Binding`]): a resource name, a readability flag and a
//!   [`Site`] that receives the instance. Several bindings may name the same
//!   resource; they all observe one instance.
//!
//! A binding whose model type was never registered is skipped with a debug
//! message. Conflicting registrations (a model registered twice, one resource
//! bound to two types or declared both readable and unreadable, names that
//! escape the root) fail `load()` before any file is touched.
//!
//! # Lifecycle
//!
//! ```text
//! load()   : setup -> configure -> distribute
//! reload() :          configure -> distribute
//! save()   : encode -> transform -> write, per resource
//! ```
//!
//! - **Configure** resolves each resource once: create the file if missing,
//!   decode it, fall back to the model's default template, then to its error
//!   policy, and run [`ConfigModel::init`].
//! - **Distribute** assigns each instance into its sites. A dropped
//!   [`Site::Weak`] owner or a failing [`Site::Setter`] is fatal.
//! - **Save** never stops at the first failure. The returned [`SaveReport`]
//!   lists what was written and what was not.
//!
//! [`Loader::shutdown`] performs the final save exactly once. Hold a
//! [`SaveGuard`] from [`Loader::save_on_drop`] to run it when `main` returns.
//!
//! # Files
//!
//! A resource named `a/b` is stored at `{root}/a/b.config`. Both `/` and `\`
//! separate directories. Readable resources hold the codec output verbatim;
//! unreadable ones are passed through a reversible character shift
//! ([`Scrambler`]). The shift only deters casual edits; it is not encryption.
//!
//! # Codecs
//!
//! JSON via serde is the default. A model can register one [`Customizer`] to
//! adjust indentation, compactness or strictness through a [`CodecBuilder`],
//! or implement [`SelfCodec`] and handle its text format itself.
//!
//! # Settings and CLI
//!
//! [`LoaderSettings`] (built on [confique](https://docs.rs/confique)) reads
//! `root_directory`, `logging` and `auto_load_on_startup` from TOML and
//! `STASHFIG_*` environment variables. With the `clap` feature (on by
//! default), [`LoaderArgs`] adds `--config-root`, `--quiet-config` and
//! `--no-config-autoload` to a host parser.
//!
//! # Logging
//!
//! Progress goes through `tracing` under the `stashfig` target and can be
//! silenced with the `logging` setting. Warnings and errors are always
//! emitted. The library never installs a subscriber.
//!
//! # Error handling
//!
//! All fallible operations return [`StashfigError`]. Messages name the
//! resource and model involved. [`StashfigError::is_fatal`] tells I/O and
//! save-time encoding problems, which are recovered per resource, apart from
//! everything else. See the [`error`] module for the full set.

pub mod error;
pub mod types;

mod binding;
mod builder;
mod bundle;
#[cfg(feature = "clap")]
mod cli;
mod codec;
mod file;
mod lifecycle;
mod loader;
mod model;
mod persist;
mod report;
mod resolve;
mod scramble;
mod settings;
mod validate;

#[cfg(test)]
mod fixtures;

pub use binding::{Binding, Site, Slot};
pub use builder::{Stashfig, StashfigBuilder};
pub use bundle::Bundle;
#[cfg(feature = "clap")]
pub use cli::LoaderArgs;
pub use codec::{CodecBuilder, CodecSettings, Customizer, SelfCodec};
pub use error::{BoxError, StashfigError};
pub use file::platform_root;
pub use loader::{Loader, SaveGuard};
pub use model::{ConfigModel, ModelDescriptor, Shared};
pub use scramble::{PASSPHRASE, Scrambler};
pub use settings::LoaderSettings;
pub use types::{ErrorPolicy, LoaderState, SaveReport};
