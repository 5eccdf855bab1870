//! Turns a loaded [`SkyConfig`] into a ready optical model.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use skylight_config::{AtmosphereConfig, SkyConfig};
use skylight_dome::SkyDomeCondition;
use skylight_optics::{ExpMode, LutCacheConfig, OpticalModel, load_or_build_luts};

/// Cache settings for the optics crate, or `None` if caching is disabled.
pub fn lut_cache_config(config: &SkyConfig, config_dir: &Path) -> Option<LutCacheConfig> {
    config.cache.enabled.then(|| LutCacheConfig {
        path: config.cache.resolved_path(config_dir),
        tag: config.cache.tag,
        version: config.cache.version,
    })
}

pub fn condition_from_config(atmosphere: &AtmosphereConfig) -> SkyDomeCondition {
    SkyDomeCondition {
        sun_direction: Vec3::from_array(atmosphere.sun_direction),
        rgb_wavelengths: Vec3::from_array(atmosphere.wavelengths_nm),
        sun_intensity: Vec3::from_array(atmosphere.sun_intensity),
        km: atmosphere.km,
        kr: atmosphere.kr,
        g: atmosphere.g,
    }
}

/// Load or build the LUTs and configure a model from `config`.
pub fn build_model(config: &SkyConfig, config_dir: &Path) -> OpticalModel {
    let cache = lut_cache_config(config, config_dir);
    let luts = Arc::new(load_or_build_luts(cache.as_ref()));

    let mut model = OpticalModel::new(luts);
    model.set_integration_step(config.quality.clamped_quality());
    model.set_camera_height(config.atmosphere.camera_height_m);
    if config.quality.fast_exp {
        model.set_exp_mode(ExpMode::Fast);
    }
    condition_from_config(&config.atmosphere).apply_to(&mut model);
    model
}
