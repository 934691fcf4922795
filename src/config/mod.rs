//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Window geometry and placement
    pub window: WindowSettings,
    /// Visibility enforcement settings
    pub visibility: VisibilitySettings,
    /// Quit hotkey settings
    pub hotkey: HotkeySettings,
    /// Run state colors
    pub colors: ColorSettings,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging (RUST_LOG may override the level)
    pub debug: bool,
}

/// Window geometry and placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Window title
    pub title: String,
    /// Fixed window width in logical points
    pub width: f32,
    /// Fixed window height in logical points
    pub height: f32,
    /// Distance from the window's left edge to the right edge of the screen
    pub right_margin: f32,
    /// Distance from the top of the screen
    pub top_offset: f32,
    /// Position used until the monitor size is known
    pub fallback_position: (f32, f32),
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Gnome Bot Overlay".to_string(),
            width: 200.0,
            height: 100.0,
            right_margin: 220.0,
            top_offset: 50.0,
            fallback_position: (50.0, 50.0),
        }
    }
}

/// Visibility enforcement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    /// Interval of the periodic visibility check
    pub check_interval_ms: u64,
    /// Re-assert the topmost level when the window loses focus
    pub enforce_on_focus_loss: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            enforce_on_focus_loss: true,
        }
    }
}

/// Which global listener delivers the quit chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyBackend {
    /// Raw OS keyboard hook with modifier tracking
    #[default]
    Raw,
    /// Hotkeys registered with the OS
    Registered,
}

/// Quit hotkey settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    /// Chords that trigger the quit sequence, e.g. "Ctrl+Q"
    pub quit: Vec<String>,
    /// Global listener backend
    pub backend: HotkeyBackend,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            quit: vec!["Ctrl+Q".to_string(), "Super+Q".to_string()],
            backend: HotkeyBackend::Raw,
        }
    }
}

/// Background colors for each run state (RGB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub running: [u8; 3],
    pub stopped: [u8; 3],
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            running: [0, 128, 0],
            stopped: [255, 0, 0],
        }
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "gnomebot", "GnomeBotOverlay")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
