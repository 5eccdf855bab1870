//! The work a sweep job performs on the back buffer.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;
use skylight_optics::OpticalModel;

use crate::condition::SkyDomeCondition;
use crate::params::{SkyDomeFrame, SkyLightConstants};
use crate::progress::{HemisphereBucket, SweepProgress, hemisphere_bucket};
use crate::texture::{DOME_HEIGHT, DOME_TEXELS, DOME_WIDTH};

/// Row whose in-scattering is averaged into the haze colour.
pub(crate) const HAZE_ROW: usize = DOME_HEIGHT - 2;

/// View direction of texel `index` (Z up, row 0 at the zenith, last row on
/// the horizon).
pub fn texel_direction(index: usize) -> Vec3 {
    let x = index % DOME_WIDTH;
    let y = index / DOME_WIDTH;
    let lon = TAU * x as f32 / DOME_WIDTH as f32;
    let lat = FRAC_PI_2 * y as f32 / (DOME_HEIGHT - 1) as f32;
    let (sin_lon, cos_lon) = lon.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();
    Vec3::new(cos_lon * sin_lat, sin_lon * sin_lat, cos_lat)
}

/// Everything a sweep mutates, moved wholesale into the running job.
#[derive(Debug)]
pub(crate) struct SweepState {
    pub model: OpticalModel,
    /// Condition the current sweep is computed for.
    pub condition: SkyDomeCondition,
    pub progress: SweepProgress,
}

impl SweepState {
    pub fn new(model: OpticalModel, condition: SkyDomeCondition) -> Self {
        Self {
            model,
            condition,
            progress: SweepProgress::default(),
        }
    }

    /// Begin a new sweep for `condition`.
    pub fn restart(&mut self, condition: SkyDomeCondition) {
        self.condition = condition;
        self.progress.reset();
    }

    /// Compute up to `budget` texels into `frame`.
    ///
    /// Returns `true` if this call wrote the last texel, in which case the
    /// frame's constants and `timestamp` are final. A complete sweep is
    /// left untouched.
    pub fn step(&mut self, frame: &mut SkyDomeFrame, budget: usize, timestamp: i64) -> bool {
        if self.progress.is_complete() {
            return false;
        }
        if self.progress.texels_computed == 0 {
            self.progress.reset();
            self.condition.apply_to(&mut self.model);
        }

        let start = self.progress.texels_computed;
        let end = (start + budget).min(DOME_TEXELS);
        for index in start..end {
            let color = self.model.compute_sky_color(texel_direction(index));
            frame
                .texture
                .write(index, color.mie_no_premul, color.rayleigh_no_premul);

            let (x, y) = (index % DOME_WIDTH, index / DOME_WIDTH);
            if y == HAZE_ROW {
                self.progress.haze += color.in_scattering;
                self.progress.haze_mie_no_premul += color.mie_no_premul;
                self.progress.haze_rayleigh_no_premul += color.rayleigh_no_premul;
            }
            self.progress.hemisphere[hemisphere_bucket(x, y)] += color.in_scattering;
        }
        self.progress.texels_computed = end;

        if !self.progress.is_complete() {
            return false;
        }
        frame.constants = self.finalize();
        frame.timestamp = timestamp;
        true
    }

    fn finalize(&self) -> SkyLightConstants {
        let shader = self.model.shader_constants();
        let inv_width = 1.0 / DOME_WIDTH as f32;
        let hemisphere = self.progress.hemisphere_averages();
        let bucket = |b: HemisphereBucket| hemisphere[b as usize];

        SkyLightConstants {
            partial_mie_in_scattering: shader.partial_mie_in_scattering,
            partial_rayleigh_in_scattering: shader.partial_rayleigh_in_scattering,
            sun_direction: shader.sun_direction,
            phase_function_consts: shader.phase_function_consts,
            haze_color: (self.progress.haze * inv_width).extend(0.0),
            haze_color_mie_no_premul: (self.progress.haze_mie_no_premul * inv_width).extend(0.0),
            haze_color_rayleigh_no_premul: (self.progress.haze_rayleigh_no_premul * inv_width)
                .extend(0.0),
            sky_color_top: bucket(HemisphereBucket::Top),
            sky_color_north: bucket(HemisphereBucket::North),
            sky_color_east: bucket(HemisphereBucket::East),
            sky_color_south: bucket(HemisphereBucket::South),
            sky_color_west: bucket(HemisphereBucket::West),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::shared_luts;
    use half::f16;

    fn state() -> SweepState {
        let model = OpticalModel::new(shared_luts());
        let condition = SkyDomeCondition::from_state(model.state());
        SweepState::new(model, condition)
    }

    #[test]
    fn test_texel_direction_grid() {
        let zenith = texel_direction(0);
        assert!((zenith - Vec3::Z).length() < 1e-6);
        // Last row lies on the horizon.
        let horizon = texel_direction((DOME_HEIGHT - 1) * DOME_WIDTH);
        assert!(horizon.z.abs() < 1e-6);
        assert!((horizon.x - 1.0).abs() < 1e-6);
        // A quarter turn in longitude.
        let side = texel_direction((DOME_HEIGHT - 1) * DOME_WIDTH + DOME_WIDTH / 4);
        assert!((side.y - 1.0).abs() < 1e-6);
        for i in (0..DOME_TEXELS).step_by(37) {
            assert!((texel_direction(i).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_partial_step_advances_counter() {
        let mut sweep = state();
        let mut frame = SkyDomeFrame::new();
        assert!(!sweep.step(&mut frame, 100, 1));
        assert_eq!(sweep.progress.texels_computed, 100);
        assert_eq!(frame.texture.mie_texels()[99].a, f16::ONE);
        assert_eq!(frame.texture.mie_texels()[100].a, f16::ZERO);
        assert_eq!(frame.timestamp, -1);
    }

    #[test]
    fn test_full_sweep_writes_every_texel() {
        let mut sweep = state();
        let mut frame = SkyDomeFrame::new();
        assert!(sweep.step(&mut frame, DOME_TEXELS * 4, 7));
        assert_eq!(sweep.progress.texels_computed, DOME_TEXELS);
        assert!(frame.texture.mie_texels().iter().all(|t| t.a == f16::ONE));
        assert!(frame.texture.rayleigh_texels().iter().all(|t| t.a == f16::ONE));
        assert_eq!(frame.timestamp, 7);

        // A complete sweep ignores further steps.
        let before = frame.clone();
        assert!(!sweep.step(&mut frame, 10, 8));
        assert_eq!(frame, before);
        assert_eq!(sweep.progress.texels_computed, DOME_TEXELS);
    }

    #[test]
    fn test_haze_is_row_average() {
        let mut sweep = state();
        let mut frame = SkyDomeFrame::new();
        sweep.step(&mut frame, DOME_TEXELS, 1);

        let model = &sweep.model;
        let mut sum = Vec3::ZERO;
        for x in 0..DOME_WIDTH {
            sum += model
                .compute_sky_color(texel_direction(HAZE_ROW * DOME_WIDTH + x))
                .in_scattering;
        }
        let expected = sum / DOME_WIDTH as f32;
        let haze = frame.constants.haze_color.truncate();
        assert!(expected.max_element() > 0.0);
        assert!((haze - expected).abs().max_element() <= expected.max_element() * 1e-4);
    }

    #[test]
    fn test_constants_follow_condition() {
        let mut sweep = state();
        let condition = SkyDomeCondition {
            sun_direction: Vec3::new(1.0, 0.0, 1.0),
            ..sweep.condition
        };
        sweep.restart(condition);
        let mut frame = SkyDomeFrame::new();
        sweep.step(&mut frame, DOME_TEXELS, 1);
        let expected = Vec3::new(1.0, 0.0, 1.0).normalize();
        assert!((frame.constants.sun_direction.truncate() - expected).length() < 1e-6);
        assert!(frame.constants.sky_color_top.min_element() > 0.0);
    }

    #[test]
    fn test_restart_clears_progress() {
        let mut sweep = state();
        let mut frame = SkyDomeFrame::new();
        sweep.step(&mut frame, 500, 1);
        let condition = sweep.condition;
        sweep.restart(condition);
        assert_eq!(sweep.progress, SweepProgress::default());
    }
}
