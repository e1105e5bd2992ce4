// Application settings
// Loaded from ~/.config/launchboard/settings.toml

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Write { path: PathBuf, source: std::io::Error },
    Encode(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            Self::Parse { path, source } => write!(f, "invalid settings in {}: {}", path.display(), source),
            Self::Write { path, source } => write!(f, "cannot write {}: {}", path.display(), source),
            Self::Encode(e) => write!(f, "cannot encode settings: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Encode(e) => Some(e),
        }
    }
}

/// KPI color thresholds, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiSettings {
    /// At or above: green
    pub green_at: f64,
    /// At or above: yellow. Below: red
    pub yellow_at: f64,
}

impl Default for KpiSettings {
    fn default() -> Self {
        Self {
            green_at: 80.0,
            yellow_at: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite store
    pub database: PathBuf,

    /// Default output directory for seller exports
    pub export_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset
    pub log_level: String,

    /// Extract sheets on worker threads
    pub parallel_sheets: bool,

    pub kpi: KpiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: Self::default_database(),
            export_dir: PathBuf::from("exports"),
            log_level: "warn".to_string(),
            parallel_sheets: true,
            kpi: KpiSettings::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("launchboard")
            .join("settings.toml")
    }

    fn default_database() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("launchboard")
            .join("launches.db")
    }

    /// A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Encode)
    }

    /// Write settings, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(write_err)
    }
}
