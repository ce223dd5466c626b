//! Application Configuration
//!
//! Cleaner, cache and catalog settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cleaning::{CachePolicy, CleanerConfig, UNKNOWN_MONITOR};
use crate::fields::{load_registry, DeviceType, FieldRegistry};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cleaning behavior
    pub cleaning: CleaningConfig,
    /// Per-monitor state limits
    pub cache: CacheConfig,
    /// Field catalog selection
    pub fields: FieldsConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Settings for a [`crate::Cleaner`]
    pub fn cleaner_config(&self) -> CleanerConfig {
        CleanerConfig {
            window: Duration::from_secs(self.cleaning.window_seconds),
            unknown_monitor_id: self.cleaning.unknown_monitor_id.clone(),
            cache: CachePolicy {
                max_monitors: self.cache.max_monitors,
                idle_timeout: self.cache.idle_timeout_secs.map(Duration::from_secs),
            },
        }
    }

    /// Build the field registry: the catalog file when one is configured,
    /// otherwise the built-in tables for the selected devices.
    pub fn registry(&self) -> Result<FieldRegistry> {
        match &self.fields.catalog_path {
            Some(path) => load_registry(path),
            None => FieldRegistry::for_devices(&self.fields.devices)
                .context("Failed to build built-in field catalog"),
        }
    }
}

/// Cleaning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// How long a last known good value may stand in for a bad reading
    pub window_seconds: u64,
    /// Monitor identity used for frames without one
    pub unknown_monitor_id: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            window_seconds: 10,
            unknown_monitor_id: UNKNOWN_MONITOR.to_string(),
        }
    }
}

/// Monitor cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of monitors remembered at once
    pub max_monitors: usize,
    /// Forget monitors not seen for this many seconds
    pub idle_timeout_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_monitors: 256,
            idle_timeout_secs: Some(3600),
        }
    }
}

/// Field catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Built-in device catalogs to load
    pub devices: Vec<DeviceType>,
    /// TOML catalog replacing the built-in tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            devices: vec![DeviceType::Monitor, DeviceType::Respirator, DeviceType::Ivac],
            catalog_path: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse configuration {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write configuration {:?}", path))?;
    Ok(())
}
