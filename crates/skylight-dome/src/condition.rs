use glam::Vec3;
use skylight_optics::{AtmosphericState, OpticalModel};

/// Snapshot of the atmospheric inputs a sweep is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyDomeCondition {
    pub sun_direction: Vec3,
    /// Red, green and blue wavelengths in nanometres.
    pub rgb_wavelengths: Vec3,
    pub sun_intensity: Vec3,
    pub km: f32,
    pub kr: f32,
    pub g: f32,
}

impl Default for SkyDomeCondition {
    fn default() -> Self {
        Self::from_state(&AtmosphericState::default())
    }
}

impl SkyDomeCondition {
    pub fn from_state(state: &AtmosphericState) -> Self {
        Self {
            sun_direction: state.sun_direction,
            rgb_wavelengths: state.rgb_wavelengths,
            sun_intensity: state.sun_intensity,
            km: state.km,
            kr: state.kr,
            g: state.g,
        }
    }

    /// Push this condition into `model`. Invalid wavelengths keep the
    /// model's previous ones.
    pub fn apply_to(&self, model: &mut OpticalModel) {
        model.set_sun_direction(self.sun_direction);
        if let Err(err) = model.set_rgb_wavelengths(self.rgb_wavelengths) {
            tracing::warn!("Ignoring sky condition wavelengths: {err}");
        }
        model.set_atmospheric_conditions(self.sun_intensity, self.km, self.kr, self.g);
    }
}
