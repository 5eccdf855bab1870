//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "sky.ron";

/// Lowest accepted incremental update rate, in percent of the dome per frame.
const MIN_UPDATE_RATE_PERCENT: f32 = 0.01;

/// Top-level sky configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkyConfig {
    /// Initial atmospheric condition.
    pub atmosphere: AtmosphereConfig,
    /// Evaluator quality settings.
    pub quality: QualityConfig,
    /// Time-slicing of dome recomputation.
    pub update: UpdateConfig,
    /// Optical lookup-table cache.
    pub cache: CacheConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Atmospheric condition applied when the sky is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtmosphereConfig {
    /// Direction toward the sun (Z up). Normalized on use.
    pub sun_direction: [f32; 3],
    /// Linear RGB sun intensity.
    pub sun_intensity: [f32; 3],
    /// Mie scattering coefficient.
    pub km: f32,
    /// Rayleigh scattering coefficient.
    pub kr: f32,
    /// Mie asymmetry factor, clamped to [-0.9995, 0.9995] by the model.
    pub g: f32,
    /// Red, green and blue wavelengths in nanometres, each within [380, 780].
    pub wavelengths_nm: [f32; 3],
    /// Viewer height above sea level in meters.
    pub camera_height_m: f32,
}

/// Evaluator quality settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Sky quality: 1 integrates every atmosphere shell, 2 every other shell.
    pub sky_quality: u32,
    /// Use the bit-trick exponential in the per-texel path.
    pub fast_exp: bool,
}

/// Time-slicing of dome recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Percentage of the dome recomputed per frame.
    pub rate_percent_per_frame: f32,
    /// Run sweeps on a background worker thread instead of inline.
    pub worker_thread: bool,
}

/// Optical lookup-table cache file settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Load/save the cache at all.
    pub enabled: bool,
    /// Cache file path. Relative paths resolve against the config directory.
    pub path: PathBuf,
    /// Magic tag stored in the file header.
    pub tag: u32,
    /// Format version stored after the tag.
    pub version: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            sun_direction: [0.35, 0.25, 0.9],
            sun_intensity: [20.0, 20.0, 20.0],
            km: 0.001,
            kr: 0.00245,
            g: -0.995,
            wavelengths_nm: [650.0, 570.0, 475.0],
            camera_height_m: 0.0,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            sky_quality: 1,
            fast_exp: false,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            rate_percent_per_frame: 0.12,
            worker_thread: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("optical.lut"),
            tag: 0x4C59_4B53,
            version: 0x0001_0002,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl QualityConfig {
    /// Sky quality clamped into the supported `[1, 2]` range.
    pub fn clamped_quality(&self) -> u32 {
        self.sky_quality.clamp(1, 2)
    }
}

impl UpdateConfig {
    /// Update rate with non-positive values raised to the minimum rate.
    pub fn effective_rate(&self) -> f32 {
        if self.rate_percent_per_frame <= 0.0 || self.rate_percent_per_frame.is_nan() {
            MIN_UPDATE_RATE_PERCENT
        } else {
            self.rate_percent_per_frame
        }
    }
}

impl CacheConfig {
    /// Resolve the cache path against `base` when it is relative.
    pub fn resolved_path(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }
}

/// Default configuration directory: `<os config dir>/skylight`.
///
/// Falls back to the working directory when the OS exposes none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skylight")
}

// --- Load / Save / Reload ---

impl SkyConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded sky config from {}", config_path.display());
            Ok(config)
        } else {
            let config = SkyConfig::default();
            config.save(config_dir)?;
            log::info!("Created default sky config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `sky.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(|source| ConfigError::Serialize {
                path: config_path.clone(),
                source,
            })?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Sky config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<SkyConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
