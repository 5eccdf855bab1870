//! Half-float RGBA dome textures.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use half::f16;

pub const DOME_WIDTH: usize = 64;
pub const DOME_HEIGHT: usize = 32;
pub const DOME_TEXELS: usize = DOME_WIDTH * DOME_HEIGHT;

/// Bytes per texture row.
pub const DOME_ROW_PITCH: usize = DOME_WIDTH * std::mem::size_of::<Half4>();

/// One RGBA16F texel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Half4 {
    pub r: f16,
    pub g: f16,
    pub b: f16,
    pub a: f16,
}

impl Half4 {
    /// Opaque texel from a linear colour.
    pub fn from_rgb(rgb: Vec3) -> Self {
        Self {
            r: f16::from_f32(rgb.x),
            g: f16::from_f32(rgb.y),
            b: f16::from_f32(rgb.z),
            a: f16::ONE,
        }
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r.to_f32(), self.g.to_f32(), self.b.to_f32(), self.a.to_f32())
    }
}

/// Mie and Rayleigh in-scattering over the dome, row-major from the zenith
/// (row 0) down to the horizon.
///
/// `Default` is an unallocated placeholder; use [`SkyDomeTexture::new`] for
/// a usable texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkyDomeTexture {
    mie: Vec<Half4>,
    rayleigh: Vec<Half4>,
}

impl SkyDomeTexture {
    /// Zero-filled texture (alpha 0 marks unwritten texels).
    pub fn new() -> Self {
        Self {
            mie: vec![Half4::default(); DOME_TEXELS],
            rayleigh: vec![Half4::default(); DOME_TEXELS],
        }
    }

    /// Texture size in bytes, both layers.
    pub const BYTES: usize = 2 * DOME_TEXELS * std::mem::size_of::<Half4>();

    #[inline]
    pub fn write(&mut self, index: usize, mie: Vec3, rayleigh: Vec3) {
        debug_assert!(index < DOME_TEXELS);
        self.mie[index] = Half4::from_rgb(mie);
        self.rayleigh[index] = Half4::from_rgb(rayleigh);
    }

    pub fn mie_texels(&self) -> &[Half4] {
        &self.mie
    }

    pub fn rayleigh_texels(&self) -> &[Half4] {
        &self.rayleigh
    }

    /// Raw Mie layer bytes for upload.
    pub fn mie_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.mie.as_slice())
    }

    /// Raw Rayleigh layer bytes for upload.
    pub fn rayleigh_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.rayleigh.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<Half4>(), 8);
        assert_eq!(DOME_ROW_PITCH, 512);
        assert_eq!(SkyDomeTexture::BYTES, 2 * 2048 * 8);
    }

    #[test]
    fn test_write_sets_alpha() {
        let mut tex = SkyDomeTexture::new();
        assert_eq!(tex.mie_texels()[5].a, f16::ZERO);
        tex.write(5, Vec3::new(0.5, 1.0, 2.0), Vec3::new(4.0, 8.0, 16.0));
        assert_eq!(tex.mie_texels()[5].to_vec4(), Vec4::new(0.5, 1.0, 2.0, 1.0));
        assert_eq!(tex.rayleigh_texels()[5].to_vec4(), Vec4::new(4.0, 8.0, 16.0, 1.0));
    }

    #[test]
    fn test_byte_views() {
        let tex = SkyDomeTexture::new();
        assert_eq!(tex.mie_bytes().len(), DOME_TEXELS * 8);
        assert_eq!(tex.rayleigh_bytes().len(), DOME_ROW_PITCH * DOME_HEIGHT);
    }

    #[test]
    fn test_default_is_unallocated() {
        assert!(SkyDomeTexture::default().mie_texels().is_empty());
    }
}
