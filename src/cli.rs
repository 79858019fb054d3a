//! Clap adapter for stashfig.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`LoaderArgs`]
//! adds loader flags to a host's parser; [`LoaderArgs::apply`] layers them
//! over [`LoaderSettings`] resolved from files and the environment.
//!
//! ```ignore
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     loader: LoaderArgs,
//! }
//!
//! let cli = Cli::parse();
//! let settings = cli.loader.apply(LoaderSettings::load_from("stashfig.toml")?);
//! let loader = Stashfig::builder().settings(&settings)./* ... */start()?;
//! ```

use std::path::PathBuf;

use clap::Args;

use crate::settings::LoaderSettings;

/// Loader flags to flatten into a clap parser.
#[derive(Debug, Clone, Default, Args)]
pub struct LoaderArgs {
    /// Directory holding persisted configuration resources.
    #[arg(long = "config-root", value_name = "DIR")]
    pub config_root: Option<PathBuf>,

    /// Suppress configuration progress messages.
    #[arg(long = "quiet-config")]
    pub quiet_config: bool,

    /// Build the configuration loader without loading it.
    #[arg(long = "no-config-autoload")]
    pub no_config_autoload: bool,
}

impl LoaderArgs {
    /// Override `settings` with the flags that were given.
    pub fn apply(&self, mut settings: LoaderSettings) -> LoaderSettings {
        if let Some(root) = &self.config_root {
            settings.root_directory = root.clone();
        }
        if self.quiet_config {
            settings.logging = false;
        }
        if self.no_config_autoload {
            settings.auto_load_on_startup = false;
        }
        settings
    }
}
