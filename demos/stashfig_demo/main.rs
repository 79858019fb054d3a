//! # stashfig demo application
//!
//! A small CLI that keeps its settings with stashfig. It exists to demonstrate
//! and manually verify the library, not to be useful.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example stashfig_demo -- show
//! cargo run --example stashfig_demo -- set-volume 8
//! cargo run --example stashfig_demo -- --config-root /tmp/demo show
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                   | How to exercise it                                               |
//! |---------------------------|------------------------------------------------------------------|
//! | Default creation          | First `show` creates `configs/app/settings.config`               |
//! | Save on exit              | `set-volume 8`, then `show`                                      |
//! | Unreadable resources      | `set-token abc`, then look at `configs/app/secrets.config`       |
//! | Self codec + load hook    | Run `show` twice; `launches` goes up by one each time            |
//! | Reload                    | `reload` edits nothing but re-reads every file                   |
//! | Hook failure              | Put `"volume": 99` in the settings file, then `show`             |
//! | Settings file             | `stashfig.toml` in cwd (`root_directory`, `logging`)             |
//! | Env settings              | `STASHFIG_ROOT_DIRECTORY=/tmp/demo cargo run --example ...`      |
//! | CLI settings              | `--config-root`, `--quiet-config`, `--no-config-autoload`        |
//! | Log filtering             | `RUST_LOG=stashfig=debug cargo run --example stashfig_demo ...`  |

mod models;

use clap::{Parser, Subcommand};
use stashfig::{
    Binding, LoaderArgs, LoaderSettings, ModelDescriptor, Slot, Stashfig, StashfigError,
};
use tracing_subscriber::EnvFilter;

use models::{AppSettings, Credentials, LaunchCounter};

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

static SETTINGS: Slot<AppSettings> = Slot::new();
static CREDENTIALS: Slot<Credentials> = Slot::new();
static LAUNCHES: Slot<LaunchCounter> = Slot::new();

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// stashfig demo: settings that survive restarts.
#[derive(Parser, Debug)]
#[command(name = "stashfig-demo")]
struct Cli {
    #[command(flatten)]
    loader: LoaderArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every bound configuration.
    Show,
    /// Change the volume and save on exit.
    SetVolume { volume: u8 },
    /// Store a token in the unreadable secrets resource.
    SetToken { token: String },
    /// Re-read every resource from disk.
    Reload,
}

fn show() {
    if let Some(settings) = SETTINGS.get() {
        let settings = settings.read();
        println!("name    {}", settings.name);
        println!("volume  {}", settings.volume);
        println!("theme   {}", settings.theme);
    }
    if let Some(credentials) = CREDENTIALS.get() {
        let shown = if credentials.read().token.is_empty() {
            "(none)"
        } else {
            "(set)"
        };
        println!("token   {shown}");
    }
    if let Some(counter) = LAUNCHES.get() {
        println!("launches {}", counter.read().launches);
    }
}

fn main() -> Result<(), StashfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stashfig=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.loader.apply(LoaderSettings::load_from("stashfig.toml")?);

    let loader = Stashfig::builder()
        .settings(&settings)
        .model(ModelDescriptor::<AppSettings>::json().customize(|codec| {
            codec.indent(4);
            Ok(())
        }))
        .model(ModelDescriptor::<Credentials>::json())
        .model(ModelDescriptor::<LaunchCounter>::self_codec().init_on_reload(false))
        .bind(Binding::new("app/settings", &SETTINGS))
        .bind(Binding::new("app/secrets", &CREDENTIALS).readable(false))
        .bind(Binding::new("launches", &LAUNCHES))
        .start()?;

    if !loader.is_loaded() {
        println!("Auto-load disabled; loading on demand");
        loader.load()?;
    }
    let _guard = loader.save_on_drop();

    match cli.command {
        Commands::Show => show(),
        Commands::SetVolume { volume } => {
            if let Some(settings) = SETTINGS.get() {
                settings.write().volume = volume;
            }
            show();
        }
        Commands::SetToken { token } => {
            if let Some(credentials) = CREDENTIALS.get() {
                credentials.write().token = token;
            }
            println!("Token stored in {}", loader.resource_path("app/secrets").display());
        }
        Commands::Reload => {
            loader.reload()?;
            show();
        }
    }
    Ok(())
}
