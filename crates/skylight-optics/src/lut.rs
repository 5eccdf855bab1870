//! Precomputed optical-depth and density-scale tables.
//!
//! Rows are indexed by a nonlinear height remap that packs most shells into
//! the dense lower atmosphere; columns by the cosine of the vertical view
//! angle, from straight up (index 0) to straight down (last index).

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;

use crate::integrate::DensityProfile;
use crate::math::{exp_precise, ray_sphere_intersect};

/// Number of height shells.
pub const HEIGHT_STEPS: usize = 32;
/// Number of view-angle samples per shell.
pub const ANGULAR_STEPS: usize = 256;

pub const EARTH_RADIUS: f32 = 6_368_000.0;
pub const MAX_ATMOSPHERE_HEIGHT: f32 = 100_000.0;
pub const MIE_DENSITY_HEIGHT: f32 = 1_200.0;
pub const RAYLEIGH_DENSITY_HEIGHT: f32 = 7_994.0;

/// Optical depth stored for rays that hit the ground.
pub const EARTH_HIT_DEPTH: f32 = 1.0e10;

/// Path lengths are stored in units of this many meters.
pub const OPTICAL_UNIT: f32 = 32_000.0;

/// Integrated Mie and Rayleigh optical depth from a shell to the top of the
/// atmosphere.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OpticalDepthEntry {
    pub mie: f32,
    pub rayleigh: f32,
}

/// Density falloff at one shell.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OpticalScaleEntry {
    pub layer_height: f32,
    pub mie_scale: f32,
    pub rayleigh_scale: f32,
}

impl OpticalDepthEntry {
    pub const EARTH_HIT: Self = Self {
        mie: EARTH_HIT_DEPTH,
        rayleigh: EARTH_HIT_DEPTH,
    };

    #[inline]
    fn max(self, other: Self) -> Self {
        Self {
            mie: self.mie.max(other.mie),
            rayleigh: self.rayleigh.max(other.rayleigh),
        }
    }

    #[inline]
    fn average(self, other: Self) -> Self {
        Self {
            mie: (self.mie + other.mie) * 0.5,
            rayleigh: (self.rayleigh + other.rayleigh) * 0.5,
        }
    }

    #[inline]
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            mie: self.mie + (other.mie - self.mie) * t,
            rayleigh: self.rayleigh + (other.rayleigh - self.rayleigh) * t,
        }
    }
}

impl OpticalScaleEntry {
    pub fn at_height(layer_height: f32) -> Self {
        Self {
            layer_height,
            mie_scale: exp_precise(-layer_height / MIE_DENSITY_HEIGHT),
            rayleigh_scale: exp_precise(-layer_height / RAYLEIGH_DENSITY_HEIGHT),
        }
    }
}

/// Height in meters of shell `index`.
pub fn height_index_to_height(index: usize) -> f32 {
    let x = index as f64 / (HEIGHT_STEPS - 1) as f64;
    (MAX_ATMOSPHERE_HEIGHT as f64 * (10.0 * (x - 1.0)).exp() * x) as f32
}

/// Cosine of the vertical angle sampled by column `index`.
pub fn angular_index_to_cos(index: usize) -> f32 {
    1.0 - 2.0 * index as f32 / (ANGULAR_STEPS - 1) as f32
}

/// Fractional column for a cosine, clamped into the table.
pub fn cos_to_angular_index(cos: f32) -> f32 {
    ((1.0 - cos) * 0.5 * (ANGULAR_STEPS - 1) as f32).clamp(0.0, (ANGULAR_STEPS - 1) as f32)
}

/// Split a fractional index into `(lower, upper, t)`.
///
/// At or past the last index both neighbours are the last entry and `t` is
/// zero, so the entry comes back unmodified.
#[inline]
pub(crate) fn split_index(f: f32, len: usize) -> (usize, usize, f32) {
    let last = len - 1;
    let f = if f.is_nan() { 0.0 } else { f.max(0.0) };
    let lower = f.floor() as usize;
    if lower >= last {
        (last, last, 0.0)
    } else {
        (lower, lower + 1, f - lower as f32)
    }
}

/// Optical-depth table plus per-shell density scales.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalLuts {
    pub(crate) depth: Vec<OpticalDepthEntry>,
    pub(crate) scale: Vec<OpticalScaleEntry>,
}

impl OpticalLuts {
    /// Integrate every table entry. Takes a noticeable fraction of a second
    /// in release builds; prefer [`crate::cache::load_or_build_luts`].
    pub fn build() -> Self {
        let start = Instant::now();
        let earth_radius = EARTH_RADIUS as f64;
        let top_radius = earth_radius + MAX_ATMOSPHERE_HEIGHT as f64;
        let mie = DensityProfile {
            earth_radius,
            scale_height: MIE_DENSITY_HEIGHT as f64,
        };
        let rayleigh = DensityProfile {
            earth_radius,
            scale_height: RAYLEIGH_DENSITY_HEIGHT as f64,
        };
        let inv_unit = 1.0 / OPTICAL_UNIT as f64;

        let mut depth = Vec::with_capacity(HEIGHT_STEPS * ANGULAR_STEPS);
        let mut scale = Vec::with_capacity(HEIGHT_STEPS);

        for h in 0..HEIGHT_STEPS {
            let height = height_index_to_height(h);
            scale.push(OpticalScaleEntry::at_height(height));

            let origin = DVec3::new(0.0, 0.0, earth_radius + height as f64);
            let mut running = OpticalDepthEntry::default();
            let mut previous_valid = false;

            for a in 0..ANGULAR_STEPS {
                let cos = angular_index_to_cos(a) as f64;
                let sin = (1.0 - cos * cos).max(0.0).sqrt();
                let dir = DVec3::new(sin, 0.0, cos);

                let entry = if hits_earth(origin, dir, earth_radius) {
                    let entry = if previous_valid {
                        running.average(OpticalDepthEntry::EARTH_HIT)
                    } else {
                        OpticalDepthEntry::EARTH_HIT
                    };
                    previous_valid = false;
                    entry
                } else {
                    let exit = ray_sphere_intersect(origin, dir, top_radius)
                        .map_or(0.0, |(_, far)| far.max(0.0));
                    let end = origin + dir * exit;
                    previous_valid = true;
                    OpticalDepthEntry {
                        mie: (mie.integrate(origin, end) * inv_unit) as f32,
                        rayleigh: (rayleigh.integrate(origin, end) * inv_unit) as f32,
                    }
                };

                running = entry.max(running);
                depth.push(running);
            }
        }

        tracing::info!("Built optical depth LUTs in {:.2?}", start.elapsed());
        Self { depth, scale }
    }

    pub fn depth_entries(&self) -> &[OpticalDepthEntry] {
        &self.depth
    }

    pub fn scale_entries(&self) -> &[OpticalScaleEntry] {
        &self.scale
    }

    /// Entry at integer shell `height_index` and column `angular_index`.
    #[inline]
    pub fn depth_at(&self, height_index: usize, angular_index: usize) -> OpticalDepthEntry {
        self.depth[height_index * ANGULAR_STEPS + angular_index]
    }

    /// Fractional shell index for `height` meters, found by binary search
    /// over the layer heights.
    pub fn height_to_index(&self, height: f32) -> f32 {
        let first = self.scale[0].layer_height;
        let last = self.scale[HEIGHT_STEPS - 1].layer_height;
        if height.is_nan() || height <= first {
            return 0.0;
        }
        if height >= last {
            return (HEIGHT_STEPS - 1) as f32;
        }
        let upper = self.scale.partition_point(|e| e.layer_height <= height);
        let lower = upper - 1;
        let lo = self.scale[lower].layer_height;
        let hi = self.scale[upper].layer_height;
        lower as f32 + (height - lo) / (hi - lo)
    }

    /// Bilinear sample at a fractional shell index.
    pub fn sample(&self, height_index: f32, cos: f32) -> OpticalDepthEntry {
        let (h0, h1, th) = split_index(height_index, HEIGHT_STEPS);
        let (a0, a1, ta) = split_index(cos_to_angular_index(cos), ANGULAR_STEPS);
        let low = self.depth_at(h0, a0).lerp(self.depth_at(h0, a1), ta);
        let high = self.depth_at(h1, a0).lerp(self.depth_at(h1, a1), ta);
        low.lerp(high, th)
    }

    /// Optical depth from `height` meters to the top of the atmosphere
    /// along a ray whose vertical angle has cosine `cos`.
    pub fn lookup_optical_depth(&self, height: f32, cos: f32) -> OpticalDepthEntry {
        self.sample(self.height_to_index(height), cos)
    }

    /// Density scales interpolated at a fractional shell index.
    pub fn scale_at(&self, height_index: f32) -> OpticalScaleEntry {
        let (h0, h1, t) = split_index(height_index, HEIGHT_STEPS);
        let a = self.scale[h0];
        let b = self.scale[h1];
        OpticalScaleEntry {
            layer_height: a.layer_height + (b.layer_height - a.layer_height) * t,
            mie_scale: a.mie_scale + (b.mie_scale - a.mie_scale) * t,
            rayleigh_scale: a.rayleigh_scale + (b.rayleigh_scale - a.rayleigh_scale) * t,
        }
    }

    /// Heap bytes held by both tables.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of_val(self.depth.as_slice()) + std::mem::size_of_val(self.scale.as_slice())
    }
}

/// True if a ray starting on or above the ground intersects it ahead.
fn hits_earth(origin: DVec3, dir: DVec3, earth_radius: f64) -> bool {
    let b = origin.dot(dir);
    let c = (origin.length_squared() - earth_radius * earth_radius).max(0.0);
    b < 0.0 && b * b >= c
}

#[cfg(test)]
pub(crate) fn test_luts() -> std::sync::Arc<OpticalLuts> {
    use std::sync::{Arc, OnceLock};
    static LUTS: OnceLock<Arc<OpticalLuts>> = OnceLock::new();
    LUTS.get_or_init(|| Arc::new(OpticalLuts::build())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_sizes() {
        assert_eq!(std::mem::size_of::<OpticalDepthEntry>(), 8);
        assert_eq!(std::mem::size_of::<OpticalScaleEntry>(), 12);
    }

    #[test]
    fn test_height_mapping_endpoints() {
        assert_eq!(height_index_to_height(0), 0.0);
        let top = height_index_to_height(HEIGHT_STEPS - 1);
        assert!((top - MAX_ATMOSPHERE_HEIGHT).abs() < 1e-2);
        for h in 1..HEIGHT_STEPS {
            assert!(height_index_to_height(h) > height_index_to_height(h - 1));
        }
    }

    #[test]
    fn test_angular_mapping_endpoints() {
        assert_eq!(angular_index_to_cos(0), 1.0);
        assert_eq!(angular_index_to_cos(ANGULAR_STEPS - 1), -1.0);
        assert_eq!(cos_to_angular_index(1.0), 0.0);
        assert_eq!(cos_to_angular_index(-1.0), (ANGULAR_STEPS - 1) as f32);
        assert_eq!(cos_to_angular_index(-3.0), (ANGULAR_STEPS - 1) as f32);
    }

    #[test]
    fn test_split_index_edges() {
        assert_eq!(split_index(0.0, 4), (0, 1, 0.0));
        assert_eq!(split_index(1.5, 4), (1, 2, 0.5));
        assert_eq!(split_index(3.0, 4), (3, 3, 0.0));
        assert_eq!(split_index(9.0, 4), (3, 3, 0.0));
        assert_eq!(split_index(f32::NAN, 4), (0, 1, 0.0));
    }

    #[test]
    fn test_depths_non_negative_and_monotonic() {
        let luts = test_luts();
        for h in 0..HEIGHT_STEPS {
            let mut prev = OpticalDepthEntry::default();
            for a in 0..ANGULAR_STEPS {
                let e = luts.depth_at(h, a);
                assert!(e.mie >= 0.0 && e.rayleigh >= 0.0, "negative at ({h}, {a})");
                assert!(
                    e.mie >= prev.mie && e.rayleigh >= prev.rayleigh,
                    "decreasing at ({h}, {a})"
                );
                prev = e;
            }
        }
    }

    #[test]
    fn test_ground_row_blends_into_sentinel() {
        let luts = test_luts();
        // From the ground every downward column hits the earth; the first
        // one averages with the last valid sample.
        let last_valid = luts.depth_at(0, ANGULAR_STEPS / 2 - 1);
        assert!(last_valid.mie < 100.0);
        let blended = luts.depth_at(0, ANGULAR_STEPS / 2);
        assert_eq!(blended.mie, (last_valid.mie + EARTH_HIT_DEPTH) * 0.5);
        assert_eq!(luts.depth_at(0, ANGULAR_STEPS / 2 + 1), OpticalDepthEntry::EARTH_HIT);
        assert_eq!(luts.depth_at(0, ANGULAR_STEPS - 1), OpticalDepthEntry::EARTH_HIT);
    }

    #[test]
    fn test_vertical_depth_matches_scale_height() {
        let luts = test_luts();
        let zenith = luts.depth_at(0, 0);
        // Column integral of exp(-h/H) over 100 km is ~H.
        let expected_mie = MIE_DENSITY_HEIGHT / OPTICAL_UNIT;
        assert!((zenith.mie - expected_mie).abs() < expected_mie * 1e-2);
        assert!(zenith.rayleigh > zenith.mie);
    }

    #[test]
    fn test_top_shell_looking_up_is_empty() {
        let luts = test_luts();
        let e = luts.depth_at(HEIGHT_STEPS - 1, 0);
        assert!(e.mie.abs() < 1e-6 && e.rayleigh.abs() < 1e-6);
    }

    #[test]
    fn test_scale_entries() {
        let luts = test_luts();
        assert_eq!(luts.scale_entries().len(), HEIGHT_STEPS);
        let ground = luts.scale_entries()[0];
        assert_eq!(ground.layer_height, 0.0);
        assert_eq!(ground.mie_scale, 1.0);
        assert_eq!(ground.rayleigh_scale, 1.0);
        let top = luts.scale_entries()[HEIGHT_STEPS - 1];
        assert!(top.mie_scale < top.rayleigh_scale);
    }

    #[test]
    fn test_lookup_last_angular_index_unmodified() {
        let luts = test_luts();
        for h in [0, 7, HEIGHT_STEPS - 1] {
            let height = luts.scale_entries()[h].layer_height;
            let e = luts.lookup_optical_depth(height, -1.0);
            assert_eq!(e, luts.depth_at(h, ANGULAR_STEPS - 1));
        }
    }

    #[test]
    fn test_lookup_exact_grid_point() {
        let luts = test_luts();
        let height = luts.scale_entries()[5].layer_height;
        let e = luts.lookup_optical_depth(height, angular_index_to_cos(10));
        let expected = luts.depth_at(5, 10);
        assert!((e.mie - expected.mie).abs() <= expected.mie * 1e-5);
        assert!((e.rayleigh - expected.rayleigh).abs() <= expected.rayleigh * 1e-5);
    }

    #[test]
    fn test_height_to_index_interpolates() {
        let luts = test_luts();
        let lo = luts.scale_entries()[10].layer_height;
        let hi = luts.scale_entries()[11].layer_height;
        let idx = luts.height_to_index((lo + hi) * 0.5);
        assert!((idx - 10.5).abs() < 1e-3);
        assert_eq!(luts.height_to_index(-5.0), 0.0);
        assert_eq!(luts.height_to_index(1.0e7), (HEIGHT_STEPS - 1) as f32);
    }

    #[test]
    fn test_memory_usage() {
        let luts = test_luts();
        assert_eq!(
            luts.memory_usage(),
            HEIGHT_STEPS * ANGULAR_STEPS * 8 + HEIGHT_STEPS * 12
        );
    }
}
