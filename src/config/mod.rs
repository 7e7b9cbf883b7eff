//! Configuration module for ThermoVis
//!
//! This module handles two files:
//! - `config.toml` - User-editable settings (feed timing, display window,
//!   plot style, logging and autosave)
//! - `app_state.json` - Small pieces of UI state remembered between runs
//!
//! # Locations
//!
//! Config and state are stored in the platform-appropriate locations:
//! - **Linux**: `~/.config/dev.thermovis.thermovis-rs/` and
//!   `~/.local/share/dev.thermovis.thermovis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.thermovis.thermovis-rs/`
//! - **Windows**: `%APPDATA%\dev.thermovis.thermovis-rs\`
//!
//! Autosaved temperature logs go to `LOG_FILES/` inside the data directory.

use crate::error::{Result, ThermoVisError};
use crate::frontend::plot::{LayoutVariant, PlotStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.thermovis.thermovis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Directory under the data dir that receives autosaved logs
pub const LOG_FILES_DIR: &str = "LOG_FILES";

/// Default polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default heater voltage limit in V, shown in the export header
pub const DEFAULT_HEATER_VOLTAGE_LIMIT: f64 = 40.0;

/// Default display window in minutes
pub const DEFAULT_WINDOW_MINUTES: f64 = 60.0;

// ==================== Directories ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        ThermoVisError::Config("Could not determine app data directory".to_string())
    })?;
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            ThermoVisError::Config(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }
    Ok(())
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

// ==================== Config Sections ====================

/// Polling feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Time between controller reads in milliseconds
    pub poll_interval_ms: u64,
    /// Heater voltage limit in V
    pub heater_voltage_limit: f64,
    /// Capacity of the feed to UI notification queue
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            heater_voltage_limit: DEFAULT_HEATER_VOLTAGE_LIMIT,
            channel_capacity: 64,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Plot window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial width of the visible history in minutes
    pub window_minutes: f64,
    /// Lower bound of the window slider
    pub min_window_minutes: f64,
    /// Upper bound of the window slider
    pub max_window_minutes: f64,
    /// Plot layout variant
    pub variant: LayoutVariant,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            min_window_minutes: 1.0,
            max_window_minutes: 1440.0,
            variant: LayoutVariant::default(),
        }
    }
}

impl DisplayConfig {
    /// Clamp a requested width to the slider bounds
    pub fn clamp_window(&self, minutes: f64) -> f64 {
        minutes.clamp(self.min_window_minutes, self.max_window_minutes)
    }
}

/// Logging and autosave settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Periodically write the history to `LOG_FILES/` while connected
    pub autosave_enabled: bool,
    pub autosave_interval_minutes: u64,
    /// Also write tracing output to a daily rolling file
    pub file_logging: bool,
    /// Directory for the tracing log file; defaults to the data directory
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_interval_minutes: 10,
            file_logging: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_minutes * 60)
    }

    /// Directory for the rolling tracing log
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| app_data_dir().map(|p| p.join("logs")))
    }

    /// Directory for autosaved temperature logs
    pub fn autosave_dir(&self) -> Option<PathBuf> {
        app_data_dir().map(|p| p.join(LOG_FILES_DIR))
    }
}

// ==================== App Config ====================

/// Complete user configuration, stored as TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub display: DisplayConfig,
    pub style: PlotStyle,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ThermoVisError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            ThermoVisError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        for warning in config.validate() {
            tracing::warn!("{}: {}", path.display(), warning);
        }
        Ok(config)
    }

    /// Load configuration from the default location
    ///
    /// See [`AppConfig::load_or_init`]. Without a config directory the
    /// defaults are used.
    pub fn load_or_default() -> Self {
        match config_path() {
            Some(path) => Self::load_or_init(path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from `path`, writing the defaults there first if
    /// the file does not exist yet
    ///
    /// An unreadable file is logged and yields the defaults; it is never
    /// overwritten.
    pub fn load_or_init(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            match config.save_to(path) {
                Ok(()) => tracing::info!("Wrote default configuration to {}", path.display()),
                Err(e) => tracing::warn!("Could not write default configuration: {}", e),
            }
            return config;
        }
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ThermoVisError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            ThermoVisError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Replace nonsensical values with defaults
    ///
    /// Returns a description of every value that was changed.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        if self.feed.poll_interval_ms == 0 {
            warnings.push("feed.poll_interval_ms must be positive".to_string());
            self.feed.poll_interval_ms = defaults.feed.poll_interval_ms;
        }
        if !(self.feed.heater_voltage_limit > 0.0 && self.feed.heater_voltage_limit.is_finite()) {
            warnings.push("feed.heater_voltage_limit must be positive".to_string());
            self.feed.heater_voltage_limit = defaults.feed.heater_voltage_limit;
        }
        if self.feed.channel_capacity == 0 {
            warnings.push("feed.channel_capacity must be positive".to_string());
            self.feed.channel_capacity = defaults.feed.channel_capacity;
        }

        let display = &mut self.display;
        let valid_bound = |v: f64| v > 0.0 && v.is_finite();
        if !valid_bound(display.min_window_minutes)
            || !valid_bound(display.max_window_minutes)
            || display.min_window_minutes > display.max_window_minutes
        {
            warnings.push("display window bounds are invalid".to_string());
            display.min_window_minutes = defaults.display.min_window_minutes;
            display.max_window_minutes = defaults.display.max_window_minutes;
        }
        if !valid_bound(display.window_minutes) {
            warnings.push("display.window_minutes must be positive".to_string());
            display.window_minutes = defaults.display.window_minutes;
        }
        let clamped = display.clamp_window(display.window_minutes);
        if clamped != display.window_minutes {
            warnings.push(format!(
                "display.window_minutes {} clamped to {}",
                display.window_minutes, clamped
            ));
            display.window_minutes = clamped;
        }

        if self.logging.autosave_interval_minutes == 0 {
            warnings.push("logging.autosave_interval_minutes must be positive".to_string());
            self.logging.autosave_interval_minutes = defaults.logging.autosave_interval_minutes;
        }

        warnings
    }
}

// ==================== App State ====================

/// UI state remembered between runs, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migrations
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Window width the user last selected
    #[serde(default)]
    pub last_window_minutes: Option<f64>,

    /// Directory of the last manual export
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,

    #[serde(default)]
    pub dark_mode: bool,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_window_minutes: None,
            last_export_dir: None,
            dark_mode: false,
        }
    }
}

impl AppState {
    /// Load app state from a JSON file; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ThermoVisError::Config(format!("Failed to read app state: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ThermoVisError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = app_state_path() else {
            return Self::default();
        };
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to a JSON file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ThermoVisError::Serialization(format!("Failed to serialize app state: {}", e))
        })?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ThermoVisError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    /// Remember the directory a trace was exported to
    pub fn remember_export(&mut self, exported: &Path) {
        if let Some(dir) = exported.parent() {
            if !dir.as_os_str().is_empty() {
                self.last_export_dir = Some(dir.to_path_buf());
            }
        }
    }
}
