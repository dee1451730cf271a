use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::{Context, Result};
use std::fs;
use log::{debug, warn};
use crate::i18n::Language;

pub const SETTINGS_FILE: &str = "settings.toml";
pub const TOOLS_FILE: &str = "tools.json";
pub const USAGE_FILE: &str = "usage.json";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }

    /// Whether to use the dark palette. `System` asks the terminal via
    /// `COLORFGBG` ("fg;bg", background 0-6 or 8 is dark) and assumes dark
    /// when the terminal doesn't say.
    pub fn is_dark(self) -> bool {
        match self {
            Theme::Light => false,
            Theme::Dark => true,
            Theme::System => std::env::var("COLORFGBG")
                .ok()
                .and_then(|v| colorfgbg_is_dark(&v))
                .unwrap_or(true),
        }
    }
}

fn colorfgbg_is_dark(value: &str) -> Option<bool> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(bg <= 6 || bg == 8)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_interpreter", alias = "python_path")]
    pub interpreter: String,
}

fn default_font_size() -> u32 { 10 }
fn default_window_width() -> u32 { 1800 }
fn default_window_height() -> u32 { 1200 }
fn default_interpreter() -> String { "python".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_size: default_font_size(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            language: Language::default(),
            interpreter: default_interpreter(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings.normalized())
    }

    /// Clamp values into the ranges the settings editor accepts.
    pub fn normalized(mut self) -> Self {
        self.font_size = self.font_size.clamp(6, 32);
        self.window_width = self.window_width.clamp(400, 5000);
        self.window_height = self.window_height.clamp(300, 3000);
        self.interpreter = self.interpreter.trim().to_string();
        if self.interpreter.is_empty() {
            self.interpreter = default_interpreter();
        }
        self
    }
}

/// Where the three stores live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub settings_file: PathBuf,
    pub tools_file: PathBuf,
    pub usage_file: PathBuf,
}

impl DataPaths {
    /// All three files in one directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            settings_file: dir.join(SETTINGS_FILE),
            tools_file: dir.join(TOOLS_FILE),
            usage_file: dir.join(USAGE_FILE),
        }
    }

    /// Platform config dir for settings, data dir for catalog and usage log.
    pub fn platform() -> Self {
        match ProjectDirs::from("org", "ivydock", "ivydock") {
            Some(dirs) => Self {
                settings_file: dirs.config_dir().join(SETTINGS_FILE),
                tools_file: dirs.data_dir().join(TOOLS_FILE),
                usage_file: dirs.data_dir().join(USAGE_FILE),
            },
            None => Self::in_dir(Path::new(".")),
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        debug!("No settings at {:?}, using defaults", path);
        return Settings::default();
    }

    match fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|c| Settings::from_toml(&c)) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring unreadable settings {:?}: {}", path, e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
