//! # Client Configuration
//!
//! Read-only values consumed by the caches, the scene manager and the
//! readiness gate. Every section has defaults, so a config file only needs
//! to name the values it overrides.
//!
//! ```toml
//! tps = 60
//!
//! [cache]
//! max_sprites_cached = 2500
//! max_sounds_cached = 2500
//!
//! [loading]
//! minimum_load_ticks = 30
//! enforce_min_on_active = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::config::{Config, ConfigError};

/// Environment variable selecting the deployment mode
pub const ENV_VAR: &str = "SCENE_CACHE_ENV";

/// Whether the process runs in production mode (`SCENE_CACHE_ENV=production`)
pub fn is_production() -> bool {
    std::env::var(ENV_VAR).is_ok_and(|value| value == "production")
}

/// # Cache Capacities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Capacity of each sprite cache generation
    pub max_sprites_cached: usize,
    /// Capacity of each sound cache generation
    pub max_sounds_cached: usize,
    /// Capacity of the scene registry
    pub max_scenes_cached: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_sprites_cached: 2500,
            max_sounds_cached: 2500,
            max_scenes_cached: 32,
        }
    }
}

/// # Loading Screen Policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingSettings {
    /// Minimum number of ticks a loading scene stays on screen
    pub minimum_load_ticks: u64,
    /// Apply the minimum every time a camera is rebound, not only when the
    /// scene itself is activated
    pub enforce_min_on_active: bool,
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            minimum_load_ticks: 0,
            enforce_min_on_active: true,
        }
    }
}

/// Where asset bytes are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetMode {
    /// Live files below [`AssetSettings::root`]
    Filesystem,
    /// Archive compiled into the binary
    Embedded,
}

impl Default for AssetMode {
    fn default() -> Self {
        if is_production() {
            Self::Embedded
        } else {
            Self::Filesystem
        }
    }
}

/// # Asset Backend Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Base directory for assets
    pub root: PathBuf,
    /// Image sub-directory below `root`
    pub images_dir: String,
    /// Sound sub-directory below `root`
    pub sounds_dir: String,
    /// Backend selection
    pub mode: AssetMode,
}

impl AssetSettings {
    /// Directory holding images
    pub fn images_path(&self) -> PathBuf {
        self.root.join(&self.images_dir)
    }

    /// Directory holding sounds
    pub fn sounds_path(&self) -> PathBuf {
        self.root.join(&self.sounds_dir)
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            images_dir: "images".to_string(),
            sounds_dir: "sounds".to_string(),
            mode: AssetMode::default(),
        }
    }
}

/// # Complete Client Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Window / log title
    pub title: String,
    /// Simulation ticks per second
    pub tps: u32,
    /// Cache capacities
    pub cache: CacheSettings,
    /// Loading screen policy
    pub loading: LoadingSettings,
    /// Asset backend
    pub assets: AssetSettings,
}

impl ClientConfig {
    /// Create a configuration with defaults and the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set sprite and sound capacities
    pub fn with_capacities(mut self, sprites: usize, sounds: usize) -> Self {
        self.cache.max_sprites_cached = sprites;
        self.cache.max_sounds_cached = sounds;
        self
    }

    /// Set the scene registry capacity
    pub fn with_scene_capacity(mut self, scenes: usize) -> Self {
        self.cache.max_scenes_cached = scenes;
        self
    }

    /// Set the loading screen policy
    pub fn with_minimum_load(mut self, ticks: u64, enforce_min_on_active: bool) -> Self {
        self.loading.minimum_load_ticks = ticks;
        self.loading.enforce_min_on_active = enforce_min_on_active;
        self
    }

    /// Duration of one tick
    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.tps.max(1)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = &self.cache;
        if cache.max_sprites_cached == 0 || cache.max_sounds_cached == 0 {
            return Err(ConfigError::Invalid(
                "asset cache capacities must be greater than zero".to_string(),
            ));
        }
        if cache.max_scenes_cached == 0 {
            return Err(ConfigError::Invalid(
                "scene registry capacity must be greater than zero".to_string(),
            ));
        }
        if u32::try_from(cache.max_sprites_cached.max(cache.max_sounds_cached)).is_err() {
            return Err(ConfigError::Invalid(
                "asset cache capacities must fit in 32 bits".to_string(),
            ));
        }
        if self.tps == 0 {
            return Err(ConfigError::Invalid("tps must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            title: "Scene Cache Client".to_string(),
            tps: 60,
            cache: CacheSettings::default(),
            loading: LoadingSettings::default(),
            assets: AssetSettings::default(),
        }
    }
}

impl Config for ClientConfig {}
