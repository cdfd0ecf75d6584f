use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::{Coordinates, UnitSystem};

/// Upstream base URLs. Overridable for proxies and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Weather, forecast, air-quality and alerts endpoints live under this.
    pub base: String,
    /// Reverse geocoding lives under this.
    pub geo: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base: "https://api.openweathermap.org/data/2.5".to_string(),
            geo: "https://api.openweathermap.org/geo/1.0".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "imperial"
///
/// [home]
/// lat = 52.52
/// lon = 13.405
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub units: UnitSystem,
    /// Position reported when the current location is requested without
    /// explicit coordinates.
    pub home: Option<Coordinates>,
    pub geolocation_timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            units: UnitSystem::default(),
            home: None,
            geolocation_timeout_secs: 10,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weatherdash configure` and enter your OpenWeather API key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs.max(1))
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the persisted search history and custom alerts.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weatherdash", "weatherdash")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
