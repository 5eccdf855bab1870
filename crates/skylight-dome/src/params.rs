//! What a finished sweep publishes to the renderer.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use crate::texture::{DOME_HEIGHT, DOME_ROW_PITCH, DOME_WIDTH, Half4, SkyDomeTexture};

/// Scalar results derived from one completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkyLightConstants {
    /// `sunI * Km`.
    pub partial_mie_in_scattering: Vec4,
    /// `sunI * Kr / λ⁴`.
    pub partial_rayleigh_in_scattering: Vec4,
    pub sun_direction: Vec4,
    /// `(1.5 (1-g²)/(2+g²), 1+g², 2g, 0)`.
    pub phase_function_consts: Vec4,
    /// Average in-scattering just above the horizon.
    pub haze_color: Vec4,
    pub haze_color_mie_no_premul: Vec4,
    pub haze_color_rayleigh_no_premul: Vec4,
    pub sky_color_top: Vec3,
    pub sky_color_north: Vec3,
    pub sky_color_east: Vec3,
    pub sky_color_south: Vec3,
    pub sky_color_west: Vec3,
}

/// [`SkyLightConstants`] laid out for a uniform buffer.
///
/// WGSL layout (192 bytes):
/// ```wgsl
/// struct SkyLight {
///     partial_mie: vec4<f32>,
///     partial_rayleigh: vec4<f32>,
///     sun_direction: vec4<f32>,
///     phase_consts: vec4<f32>,
///     haze: vec4<f32>,
///     haze_mie: vec4<f32>,
///     haze_rayleigh: vec4<f32>,
///     hemisphere: array<vec4<f32>, 5>,
/// }
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyLightUniform {
    pub partial_mie: [f32; 4],
    pub partial_rayleigh: [f32; 4],
    pub sun_direction: [f32; 4],
    pub phase_consts: [f32; 4],
    pub haze: [f32; 4],
    pub haze_mie: [f32; 4],
    pub haze_rayleigh: [f32; 4],
    /// Top, north, east, south, west; w is unused.
    pub hemisphere: [[f32; 4]; 5],
}

impl SkyLightConstants {
    pub fn to_uniform(&self) -> SkyLightUniform {
        let hemisphere = [
            self.sky_color_top,
            self.sky_color_north,
            self.sky_color_east,
            self.sky_color_south,
            self.sky_color_west,
        ]
        .map(|c| c.extend(0.0).to_array());

        SkyLightUniform {
            partial_mie: self.partial_mie_in_scattering.to_array(),
            partial_rayleigh: self.partial_rayleigh_in_scattering.to_array(),
            sun_direction: self.sun_direction.to_array(),
            phase_consts: self.phase_function_consts.to_array(),
            haze: self.haze_color.to_array(),
            haze_mie: self.haze_color_mie_no_premul.to_array(),
            haze_rayleigh: self.haze_color_rayleigh_no_premul.to_array(),
            hemisphere,
        }
    }
}

/// One buffered dome: texture plus the constants computed with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkyDomeFrame {
    pub texture: SkyDomeTexture,
    pub constants: SkyLightConstants,
    /// Completed-sweep counter when this frame was finished, `-1` if never.
    pub timestamp: i64,
}

impl SkyDomeFrame {
    pub fn new() -> Self {
        Self {
            texture: SkyDomeTexture::new(),
            constants: SkyLightConstants::default(),
            timestamp: -1,
        }
    }
}

/// Read-only view of the front dome.
#[derive(Debug, Clone, Copy)]
pub struct SkyLightRenderParams<'a> {
    pub mie_texels: &'a [Half4],
    pub rayleigh_texels: &'a [Half4],
    pub texture_width: usize,
    pub texture_height: usize,
    /// Bytes per row in either texel slice.
    pub texture_pitch: usize,
    pub texture_timestamp: i64,
    pub constants: SkyLightConstants,
}

impl<'a> SkyLightRenderParams<'a> {
    pub fn new(frame: &'a SkyDomeFrame) -> Self {
        Self {
            mie_texels: frame.texture.mie_texels(),
            rayleigh_texels: frame.texture.rayleigh_texels(),
            texture_width: DOME_WIDTH,
            texture_height: DOME_HEIGHT,
            texture_pitch: DOME_ROW_PITCH,
            texture_timestamp: frame.timestamp,
            constants: frame.constants,
        }
    }
}
