//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\pic-curator\config.toml
//! - macOS: ~/Library/Application Support/pic-curator/config.toml
//! - Linux: ~/.config/pic-curator/config.toml
//!
//! A different file can be given explicitly (see [`load_from`]). Every
//! section is optional; missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::{OrientationPreference, Settings, Tier};

/// Name of the database file created inside the managed root by default.
pub const DEFAULT_DB_NAME: &str = "db.sqlite";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Managed root and database location
    pub library: LibraryConfig,

    /// Ingestion and ranking parameters
    pub curation: CurationConfig,

    /// Tier directory layout
    pub tiers: TierConfig,

    /// Initial selection settings
    pub settings: SettingsConfig,
}

/// Library location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Managed root directory
    pub root: PathBuf,

    /// Database file (default: `<root>/db.sqlite`)
    pub database: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            database: None,
        }
    }
}

impl LibraryConfig {
    /// Resolved database file path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_DB_NAME))
    }
}

/// Ingestion and ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Files reconciled per transaction during ingestion
    pub batch_size: usize,

    /// ELO K-factor
    pub k_factor: f64,

    /// Default number of neighbors returned with each pivot
    pub neighbors: u32,

    /// Lower bound on the size of the top-10 set
    pub top_min_candidates: u32,

    /// Image extensions considered during ingestion (lowercase, no dot)
    pub extensions: Vec<String>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            batch_size: 300,
            k_factor: 10.0,
            neighbors: 2,
            top_min_candidates: 15,
            extensions: ["jpg", "jpeg", "png", "gif", "webp", "jpg_large"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Tier directory names and rating band thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub top10: String,
    pub other: String,
    pub good: String,
    pub lower: String,
    pub bad: String,
    pub hidden: String,
    pub restored: String,

    /// Ratings strictly above this are `good`
    pub good_above: i64,

    /// Ratings strictly below this are `bad`
    pub bad_below: i64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            top10: "0_picked".to_string(),
            other: "0_other".to_string(),
            good: "1_good".to_string(),
            lower: "2_lower".to_string(),
            bad: "3_bad".to_string(),
            hidden: "_hidden".to_string(),
            restored: "_restored".to_string(),
            good_above: 1200,
            bad_below: 1150,
        }
    }
}

impl TierConfig {
    /// Root-relative directory for a tier.
    pub fn dir(&self, tier: Tier) -> &str {
        match tier {
            Tier::Top10 => &self.top10,
            Tier::Other => &self.other,
            Tier::Good => &self.good,
            Tier::Lower => &self.lower,
            Tier::Bad => &self.bad,
            Tier::Hidden => &self.hidden,
            Tier::Restored => &self.restored,
        }
    }

    /// Rating band for a rating.
    pub fn band(&self, rating: i64) -> Tier {
        if rating > self.good_above {
            Tier::Good
        } else if rating < self.bad_below {
            Tier::Bad
        } else {
            Tier::Lower
        }
    }

    /// Tier whose directory contains `rel_path`, if any.
    pub fn tier_of(&self, rel_path: &str) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|tier| Path::new(rel_path).starts_with(self.dir(*tier)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bad_below > self.good_above {
            return Err(ConfigError::Invalid(format!(
                "tiers.bad_below ({}) must not exceed tiers.good_above ({})",
                self.bad_below, self.good_above
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for tier in Tier::ALL {
            let dir = self.dir(tier);
            if dir.is_empty() || !seen.insert(dir) {
                return Err(ConfigError::Invalid(format!(
                    "tier directory for {tier} must be non-empty and unique (got {dir:?})"
                )));
            }
        }
        Ok(())
    }
}

/// Initial selection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// 0 = off, 1 = ascending, 2 = descending
    pub same_orientation: u8,

    /// Named boolean toggles
    pub toggles: BTreeMap<String, bool>,
}

impl SettingsConfig {
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        let same_orientation =
            OrientationPreference::try_from(self.same_orientation).map_err(ConfigError::Invalid)?;
        Ok(Settings {
            same_orientation,
            toggles: self.toggles.clone(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            same_orientation: settings.same_orientation.into(),
            toggles: settings.toggles.clone(),
        }
    }
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.curation.batch_size == 0 {
            return Err(ConfigError::Invalid("curation.batch_size must be > 0".into()));
        }
        if !(self.curation.k_factor.is_finite() && self.curation.k_factor > 0.0) {
            return Err(ConfigError::Invalid(
                "curation.k_factor must be a positive number".into(),
            ));
        }
        self.tiers.validate()?;
        self.settings.to_settings()?;
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pic-curator"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from a specific file
///
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => match config.validate() {
                Ok(()) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Invalid config file {:?}: {}", path, e);
                    tracing::warn!("Using default configuration");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to a specific file
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        crate::error::Error::config(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
