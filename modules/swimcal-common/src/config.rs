use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{DayType, Location};

/// Application configuration: the location registry plus the extraction
/// settings that participate in cache fingerprinting. Persisted as TOML;
/// secrets (the API key) stay in the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timezone: String,
    pub default_weekday_location: Option<String>,
    pub default_weekend_location: Option<String>,
    pub default_event_title: String,
    pub model: String,
    // Tables serialize after scalar values in TOML, so the registry stays last.
    pub locations: BTreeMap<String, Location>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            default_weekday_location: Some("Regis".to_string()),
            default_weekend_location: Some("Brandeis".to_string()),
            default_event_title: "Tyler Swim Practice".to_string(),
            model: "gemini-flash-latest".to_string(),
            locations: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Default configuration with the built-in location registry.
    pub fn with_default_locations() -> Self {
        let mut config = Self::default();

        config.add_location(Location {
            name: "Regis".to_string(),
            address: "Regis College Athletic Facility, 235 Wellesley St, Weston, MA".to_string(),
            is_default_weekday: true,
            is_default_weekend: false,
        });

        config.add_location(Location {
            name: "Brandeis".to_string(),
            address: "Gosman Sports and Convocation Center, 415 South St, Waltham, MA".to_string(),
            is_default_weekday: false,
            is_default_weekend: true,
        });

        config.add_location(Location {
            name: "Wightman".to_string(),
            address: "Wightman Tennis Center, 100 Brown St, Weston, MA".to_string(),
            is_default_weekday: false,
            is_default_weekend: false,
        });

        config
    }

    /// Add or replace a location. A set default flag moves the
    /// corresponding day-type default to this location (last write wins).
    pub fn add_location(&mut self, location: Location) {
        if location.is_default_weekday {
            self.default_weekday_location = Some(location.name.clone());
        }
        if location.is_default_weekend {
            self.default_weekend_location = Some(location.name.clone());
        }
        self.locations.insert(location.name.clone(), location);
    }

    /// Default location for a day type, if one is configured and still
    /// present in the registry.
    pub fn default_location_for(&self, day_type: DayType) -> Option<&Location> {
        let name = match day_type {
            DayType::Weekday => self.default_weekday_location.as_deref()?,
            DayType::Weekend => self.default_weekend_location.as_deref()?,
        };
        self.locations.get(name)
    }

    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration back to disk as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
            }
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Load the config file, falling back to (and persisting) the built-in
    /// defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Config load failed, using defaults");
                }
            }
        }
        let config = Self::with_default_locations();
        if let Err(err) = config.save(path) {
            warn!(path = %path.display(), error = %err, "Failed to persist default config");
        }
        config
    }
}
