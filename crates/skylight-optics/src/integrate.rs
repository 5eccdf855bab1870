//! Adaptive Simpson integration of atmospheric density along a ray.

use glam::DVec3;

use crate::math::exp_precise_f64;

/// Subdivision stops once neighbouring density samples differ by less than this.
pub const SIMPSON_TOLERANCE: f64 = 1.0e-3;

/// Hard recursion limit; a segment at this depth is integrated as-is.
pub const SIMPSON_MAX_DEPTH: u32 = 24;

/// Exponential density profile `exp(-h / scale_height)` over a planet of
/// radius `earth_radius`.
#[derive(Debug, Clone, Copy)]
pub struct DensityProfile {
    pub earth_radius: f64,
    pub scale_height: f64,
}

impl DensityProfile {
    #[inline]
    pub fn density(&self, point: DVec3) -> f64 {
        let height = (point.length() - self.earth_radius).max(0.0);
        exp_precise_f64(-height / self.scale_height)
    }

    /// Integral of the density along the segment `start..end`, in meters.
    pub fn integrate(&self, start: DVec3, end: DVec3) -> f64 {
        let f_start = self.density(start);
        let f_end = self.density(end);
        self.integrate_segment(start, f_start, end, f_end, 0)
    }

    fn integrate_segment(&self, a: DVec3, fa: f64, b: DVec3, fb: f64, depth: u32) -> f64 {
        let mid = (a + b) * 0.5;
        let fm = self.density(mid);

        let converged =
            (fa - fm).abs() < SIMPSON_TOLERANCE && (fm - fb).abs() < SIMPSON_TOLERANCE;
        if converged || depth >= SIMPSON_MAX_DEPTH {
            return (fa + 4.0 * fm + fb) / 6.0 * a.distance(b);
        }

        self.integrate_segment(a, fa, mid, fm, depth + 1)
            + self.integrate_segment(mid, fm, b, fb, depth + 1)
    }
}
