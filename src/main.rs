//! Gnome Bot Overlay - always-on-top Start/Stop overlay
//!
//! A small frameless window whose Start/Stop buttons toggle a run flag and
//! the window color. Ctrl+Q (Cmd+Q) quits from anywhere, even without focus.

mod app;
mod config;
mod hotkey;
mod overlay;
mod shared;
mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{AppConfig, HotkeyBackend};

/// Gnome Bot Overlay - Start/Stop overlay with a global quit hotkey
#[derive(Parser, Debug)]
#[command(name = "gnome-bot-overlay")]
#[command(about = "Always-on-top Start/Stop overlay; Ctrl+Q quits")]
struct Args {
    /// Config file to use instead of the platform default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Global listener backend (overrides the config file)
    #[arg(long, value_enum)]
    hotkey_backend: Option<HotkeyBackend>,

    /// Enable debug logging (RUST_LOG may override the level)
    #[arg(long)]
    debug: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = load_or_create_config(args.config.as_deref())?;
    if let Some(backend) = args.hotkey_backend {
        config.hotkey.backend = backend;
    }
    config.general.debug |= args.debug;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    init_logging(config.general.debug)?;
    install_panic_hook();
    source.log();

    let chords = hotkey::parse_chords(&config.hotkey.quit).context("invalid quit hotkey")?;

    info!("Gnome Bot Overlay starting...");
    app::run_overlay(&config, chords).map_err(|e| anyhow::anyhow!("overlay failed: {e}"))?;

    // Only reached if the event loop ends without the quit sequence
    info!("Overlay event loop ended");
    Ok(())
}

/// Initialise logging. `info` by default; with debug enabled the level is
/// `debug` and `RUST_LOG` can override it.
fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Report unhandled panics on stderr with message, location and backtrace
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = std::thread::current();
        let thread = thread.name().unwrap_or("<unnamed>");

        eprintln!("Unhandled panic in thread '{thread}': {message} at {location}");
        eprintln!("{}", Backtrace::force_capture());
        error!(thread, %location, "Unhandled panic: {}", message);
    }));
}

/// Where the effective configuration came from, logged once logging is up
#[derive(Debug)]
enum ConfigSource {
    Explicit(PathBuf),
    Loaded(PathBuf),
    CreatedDefault(PathBuf),
    Defaults(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Loaded(path) => {
                info!("Loaded configuration from {:?}", path)
            }
            ConfigSource::CreatedDefault(path) => {
                info!("Wrote default configuration to {:?}", path)
            }
            ConfigSource::Defaults(reason) => warn!("Using default configuration: {}", reason),
        }
    }
}

/// Load configuration from file or create default.
///
/// An explicit path must load. The default location falls back to defaults
/// and is written out on first run.
fn load_or_create_config(explicit: Option<&Path>) -> Result<(AppConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let config_path = match config::default_config_path() {
        Ok(path) => path,
        Err(e) => {
            let reason = format!("no config directory ({e})");
            return Ok((AppConfig::default(), ConfigSource::Defaults(reason)));
        }
    };

    if config_path.exists() {
        return Ok(match config::load_config(&config_path) {
            Ok(config) => (config, ConfigSource::Loaded(config_path)),
            Err(e) => {
                let reason = format!("unreadable config {}: {e}", config_path.display());
                (AppConfig::default(), ConfigSource::Defaults(reason))
            }
        });
    }

    let config = AppConfig::default();
    let source = match config::save_config(&config, &config_path) {
        Ok(()) => ConfigSource::CreatedDefault(config_path),
        Err(e) => ConfigSource::Defaults(format!("could not write {}: {e}", config_path.display())),
    };
    Ok((config, source))
}
