//! Atmospheric state and the per-direction sky evaluator.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::error::OpticsError;
use crate::lut::{
    EARTH_RADIUS, HEIGHT_STEPS, MAX_ATMOSPHERE_HEIGHT, OPTICAL_UNIT, OpticalDepthEntry,
    OpticalLuts, OpticalScaleEntry,
};
use crate::math::{ExpMode, inv_wavelength4, shell_exit_distance};
use crate::phase::PhaseLut;

/// Largest accepted |g|.
pub const G_LIMIT: f32 = 0.9995;
/// The phase table is rebuilt only when g moves by more than this.
const G_REBUILD_THRESHOLD: f32 = 1.0e-6;

pub const MIN_WAVELENGTH_NM: f32 = 380.0;
pub const MAX_WAVELENGTH_NM: f32 = 780.0;

/// Scattering parameters the evaluator runs with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericState {
    /// Unit vector toward the sun.
    pub sun_direction: Vec3,
    pub sun_intensity: Vec3,
    /// Mie scattering coefficient.
    pub km: f32,
    /// Rayleigh scattering coefficient.
    pub kr: f32,
    /// Mie asymmetry the phase table was built for.
    pub g: f32,
    /// Red, green and blue wavelengths in nanometres.
    pub rgb_wavelengths: Vec3,
    /// `1 / λ⁴` per channel, λ in micrometres.
    pub inv_wavelength4: Vec3,
}

impl Default for AtmosphericState {
    fn default() -> Self {
        let rgb_wavelengths = Vec3::new(650.0, 570.0, 475.0);
        Self {
            sun_direction: Vec3::Z,
            sun_intensity: Vec3::splat(20.0),
            km: 0.001,
            kr: 0.00245,
            g: -0.995,
            rgb_wavelengths,
            inv_wavelength4: inv_wavelength4(rgb_wavelengths),
        }
    }
}

/// In-scattered light along one view ray.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkyColor {
    /// Final colour with both phase functions applied.
    pub in_scattering: Vec3,
    /// Attenuated Mie density integral, before coefficients and phase.
    pub mie_no_premul: Vec3,
    /// Attenuated Rayleigh density integral, before coefficients and phase.
    pub rayleigh_no_premul: Vec3,
}

/// Constants a shader needs to finish the scattering computation per pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShaderConstants {
    /// `sunI * Km`.
    pub partial_mie_in_scattering: Vec4,
    /// `sunI * Kr / λ⁴`.
    pub partial_rayleigh_in_scattering: Vec4,
    pub sun_direction: Vec4,
    /// `(1.5 (1-g²)/(2+g²), 1+g², 2g, 0)`.
    pub phase_function_consts: Vec4,
}

/// Nishita single-scattering model over shared optical LUTs.
#[derive(Debug, Clone)]
pub struct OpticalModel {
    luts: Arc<OpticalLuts>,
    phase: PhaseLut,
    state: AtmosphericState,
    exp_mode: ExpMode,
    integration_step: u32,
    camera_height: f32,
    camera_height_index: f32,
    camera_scale: OpticalScaleEntry,
    first_shell: usize,
}

impl OpticalModel {
    /// Model with the default atmosphere and the viewer at sea level.
    pub fn new(luts: Arc<OpticalLuts>) -> Self {
        let state = AtmosphericState::default();
        let mut model = Self {
            luts,
            phase: PhaseLut::new(state.g),
            state,
            exp_mode: ExpMode::default(),
            integration_step: 1,
            camera_height: 0.0,
            camera_height_index: 0.0,
            camera_scale: OpticalScaleEntry::at_height(0.0),
            first_shell: 1,
        };
        model.set_camera_height(0.0);
        model
    }

    pub fn state(&self) -> &AtmosphericState {
        &self.state
    }

    pub fn luts(&self) -> &Arc<OpticalLuts> {
        &self.luts
    }

    pub fn phase_lut(&self) -> &PhaseLut {
        &self.phase
    }

    /// Point the sun along `direction`. Zero-length or non-finite vectors
    /// are ignored.
    pub fn set_sun_direction(&mut self, direction: Vec3) {
        // Scale into [-1, 1] first so huge components don't overflow the length.
        let scale = direction.abs().max_element();
        if direction.is_finite() && scale > 0.0 {
            self.state.sun_direction = (direction / scale).normalize();
        }
    }

    /// Set the channel wavelengths in nanometres.
    pub fn set_rgb_wavelengths(&mut self, rgb: Vec3) -> Result<(), OpticsError> {
        for wavelength in rgb.to_array() {
            if !(MIN_WAVELENGTH_NM..=MAX_WAVELENGTH_NM).contains(&wavelength) {
                return Err(OpticsError::WavelengthOutOfRange {
                    wavelength,
                    min: MIN_WAVELENGTH_NM,
                    max: MAX_WAVELENGTH_NM,
                });
            }
        }
        self.state.rgb_wavelengths = rgb;
        self.state.inv_wavelength4 = inv_wavelength4(rgb);
        Ok(())
    }

    /// Set intensity, scattering coefficients and Mie asymmetry.
    ///
    /// `g` is clamped to `±G_LIMIT`. The phase table is only rebuilt when the
    /// clamped value moves away from the current one.
    pub fn set_atmospheric_conditions(&mut self, sun_intensity: Vec3, km: f32, kr: f32, g: f32) {
        self.state.sun_intensity = sun_intensity.max(Vec3::ZERO);
        self.state.km = km.max(0.0);
        self.state.kr = kr.max(0.0);

        if g.is_nan() {
            return;
        }
        let g = g.clamp(-G_LIMIT, G_LIMIT);
        if (g - self.state.g).abs() > G_REBUILD_THRESHOLD {
            self.state.g = g;
            self.phase.rebuild(g);
        }
    }

    /// March every `step`-th shell (1 or 2).
    pub fn set_integration_step(&mut self, step: u32) {
        self.integration_step = step.clamp(1, 2);
    }

    pub fn integration_step(&self) -> u32 {
        self.integration_step
    }

    pub fn set_exp_mode(&mut self, mode: ExpMode) {
        self.exp_mode = mode;
    }

    pub fn exp_mode(&self) -> ExpMode {
        self.exp_mode
    }

    /// Viewer height above sea level, clamped into the atmosphere.
    pub fn set_camera_height(&mut self, height: f32) {
        let height = if height.is_nan() {
            0.0
        } else {
            height.clamp(0.0, MAX_ATMOSPHERE_HEIGHT)
        };
        self.camera_height = height;
        self.camera_height_index = self.luts.height_to_index(height);
        self.camera_scale = OpticalScaleEntry::at_height(height);
        self.first_shell = self
            .luts
            .scale_entries()
            .partition_point(|e| e.layer_height <= height);
    }

    pub fn camera_height(&self) -> f32 {
        self.camera_height
    }

    /// Evaluate in-scattered light arriving along `-direction`.
    ///
    /// `direction` must be unit length and is expressed in the viewer's
    /// frame (Z up).
    pub fn compute_sky_color(&self, direction: Vec3) -> SkyColor {
        let state = &self.state;
        let luts = &*self.luts;
        let exp = self.exp_mode;

        let phase = self.phase.phase(direction.dot(-state.sun_direction));
        let out_mie = 4.0 * PI * state.km;
        let out_rayleigh = 4.0 * PI * state.kr * state.inv_wavelength4;

        let camera_radius = EARTH_RADIUS + self.camera_height;
        let view0 = luts.sample(self.camera_height_index, direction.z);

        let integrand = |view: OpticalDepthEntry, sun: OpticalDepthEntry, scale: OpticalScaleEntry| {
            let view_mie = view.mie.min(view0.mie);
            let view_rayleigh = view.rayleigh.min(view0.rayleigh);
            let tau = out_mie * (view0.mie - view_mie + sun.mie)
                + out_rayleigh * (view0.rayleigh - view_rayleigh + sun.rayleigh);
            let attenuation = exp.exp3(-tau);
            (attenuation * scale.mie_scale, attenuation * scale.rayleigh_scale)
        };

        let sun0 = luts.sample(self.camera_height_index, state.sun_direction.z);
        let (mut prev_mie, mut prev_rayleigh) = integrand(view0, sun0, self.camera_scale);
        let mut prev_t = 0.0f32;
        let mut mie = Vec3::ZERO;
        let mut rayleigh = Vec3::ZERO;

        let last = HEIGHT_STEPS - 1;
        let step = self.integration_step as usize;
        let mut shell = self.first_shell;
        while shell <= last {
            let scale = luts.scale_entries()[shell];
            let t = shell_exit_distance(
                direction.z,
                camera_radius,
                EARTH_RADIUS + scale.layer_height,
                scale.layer_height - self.camera_height,
            );
            let position = Vec3::new(0.0, 0.0, camera_radius) + direction * t;
            let up = position / position.length();

            let height_index = shell as f32;
            let view = luts.sample(height_index, up.dot(direction));
            let sun = luts.sample(height_index, up.dot(state.sun_direction));
            let (cur_mie, cur_rayleigh) = integrand(view, sun, scale);

            let weight = 0.5 * (t - prev_t) / OPTICAL_UNIT;
            mie += (prev_mie + cur_mie) * weight;
            rayleigh += (prev_rayleigh + cur_rayleigh) * weight;

            prev_mie = cur_mie;
            prev_rayleigh = cur_rayleigh;
            prev_t = t;

            if shell == last {
                break;
            }
            shell = (shell + step).min(last);
        }

        let in_scattering = state.sun_intensity * state.km * phase.mie * mie
            + state.sun_intensity * state.kr * state.inv_wavelength4 * phase.rayleigh * rayleigh;

        SkyColor {
            in_scattering,
            mie_no_premul: mie,
            rayleigh_no_premul: rayleigh,
        }
    }

    pub fn shader_constants(&self) -> ShaderConstants {
        let s = &self.state;
        let g = s.g;
        let g2 = g * g;
        ShaderConstants {
            partial_mie_in_scattering: (s.sun_intensity * s.km).extend(0.0),
            partial_rayleigh_in_scattering: (s.sun_intensity * s.kr * s.inv_wavelength4)
                .extend(0.0),
            sun_direction: s.sun_direction.extend(0.0),
            phase_function_consts: Vec4::new(
                1.5 * (1.0 - g2) / (2.0 + g2),
                1.0 + g2,
                2.0 * g,
                0.0,
            ),
        }
    }

    /// Bytes held by the phase table plus the shared optical LUTs.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of_val(self.phase.entries()) + self.luts.memory_usage()
    }
}
