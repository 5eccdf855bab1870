//! Analytic Nishita single-scattering sky model.
//!
//! [`OpticalLuts`] holds the precomputed optical-depth and density-scale
//! tables (built by adaptive Simpson integration, cacheable on disk via
//! [`cache`]). [`OpticalModel`] owns the atmospheric state and the phase
//! table and evaluates in-scattered light for a view direction by ray
//! marching through the table's height shells.

pub mod cache;
mod error;
mod integrate;
mod lut;
mod math;
mod model;
mod phase;

pub use cache::{LutCacheConfig, load_or_build_luts};
pub use error::{CacheError, OpticsError};
pub use lut::{
    ANGULAR_STEPS, EARTH_RADIUS, EARTH_HIT_DEPTH, HEIGHT_STEPS, MAX_ATMOSPHERE_HEIGHT,
    MIE_DENSITY_HEIGHT, OPTICAL_UNIT, OpticalDepthEntry, OpticalLuts, OpticalScaleEntry,
    RAYLEIGH_DENSITY_HEIGHT, angular_index_to_cos, cos_to_angular_index, height_index_to_height,
};
pub use math::{ExpMode, exp_fast, exp_precise, inv_wavelength4};
pub use model::{
    AtmosphericState, G_LIMIT, MAX_WAVELENGTH_NM, MIN_WAVELENGTH_NM, OpticalModel,
    ShaderConstants, SkyColor,
};
pub use phase::{PHASE_EPSILON, PhaseEntry, PhaseLut, mie_phase, rayleigh_phase};
