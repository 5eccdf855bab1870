//! Scalar helpers shared by the LUT builder and the per-texel evaluator.

use glam::{DVec3, Vec3};

/// Exponent arguments are clamped to this magnitude before evaluation.
pub const EXP_CLAMP: f32 = 650.0;

/// Exponential used by the per-texel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpMode {
    /// `f64::exp` on the clamped argument.
    #[default]
    Precise,
    /// Schraudolph's bit-manipulation approximation. Worst-case relative
    /// error is about 4 %, which is invisible in a 64 x 32 half-float dome.
    Fast,
}

impl ExpMode {
    #[inline]
    pub fn exp(self, x: f32) -> f32 {
        match self {
            ExpMode::Precise => exp_precise(x),
            ExpMode::Fast => exp_fast(x),
        }
    }

    /// Component-wise exponential.
    #[inline]
    pub fn exp3(self, v: Vec3) -> Vec3 {
        Vec3::new(self.exp(v.x), self.exp(v.y), self.exp(v.z))
    }
}

/// `e^x` with `x` clamped to `[-650, 650]`, evaluated in double precision.
///
/// Results beyond the `f32` range saturate to `0` or `inf`. A NaN argument
/// yields `0`, so a broken optical depth attenuates fully.
#[inline]
pub fn exp_precise(x: f32) -> f32 {
    if x.is_nan() {
        return 0.0;
    }
    let x = x.clamp(-EXP_CLAMP, EXP_CLAMP);
    (x as f64).exp() as f32
}

/// `f64` form of [`exp_precise`] for the LUT builder.
#[inline]
pub(crate) fn exp_precise_f64(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(-EXP_CLAMP as f64, EXP_CLAMP as f64).exp()
}

/// Approximate `e^x` by writing `x / ln 2` straight into the exponent bits.
#[inline]
pub fn exp_fast(x: f32) -> f32 {
    // 2^23 / ln 2, and 127 * 2^23 shifted down to centre the error.
    const A: f32 = 12_102_203.0;
    const B: f32 = 1_064_866_805.0;
    if x.is_nan() {
        return 0.0;
    }
    if x < -87.0 {
        return 0.0;
    }
    if x > 88.0 {
        return f32::INFINITY;
    }
    f32::from_bits((A * x + B) as u32)
}

/// Per-channel `1 / λ⁴` with the wavelengths given in nanometres.
///
/// The conversion happens in micrometres so the values stay near unity
/// (650 nm gives ~5.6, 475 nm gives ~19.6).
pub fn inv_wavelength4(wavelengths_nm: Vec3) -> Vec3 {
    let um = wavelengths_nm * 1.0e-3;
    Vec3::ONE / (um * um * um * um)
}

/// Ray/sphere intersection for a sphere centred at the origin.
///
/// Returns `(t_near, t_far)` for a unit-length `dir`, or `None` if the ray
/// misses the sphere.
pub fn ray_sphere_intersect(origin: DVec3, dir: DVec3, radius: f64) -> Option<(f64, f64)> {
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    Some((-b - sqrt_disc, -b + sqrt_disc))
}

/// Distance along a ray from a point at radius `origin_radius` on the Z axis
/// to the far intersection with the shell of radius `shell_radius`.
///
/// `shell_offset` is `shell_radius - origin_radius`, passed separately so
/// low shells a few centimetres above the viewer keep their height.
#[inline]
pub fn shell_exit_distance(dir_z: f32, origin_radius: f32, shell_radius: f32, shell_offset: f32) -> f32 {
    let b = origin_radius as f64 * dir_z as f64;
    let c = shell_offset as f64 * (shell_radius as f64 + origin_radius as f64);
    let root = (b * b + c).max(0.0).sqrt();
    // Avoid cancelling `root` against `b` for upward rays.
    let t = if b > 0.0 { c / (b + root) } else { root - b };
    t.max(0.0) as f32
}
