//! Mie and Rayleigh phase functions and their angular lookup table.

use bytemuck::{Pod, Zeroable};

use crate::lut::{ANGULAR_STEPS, angular_index_to_cos, cos_to_angular_index, split_index};

/// Lower bound on the Mie phase denominator base.
pub const PHASE_EPSILON: f32 = 1.0e-6;

/// Phase function values for one scattering angle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PhaseEntry {
    pub mie: f32,
    pub rayleigh: f32,
}

/// Cornette-Shanks approximation of the Mie phase function.
///
/// `cos` is the cosine between the view ray and the direction light travels.
/// Both phase functions integrate to `4π` over the sphere.
pub fn mie_phase(cos: f32, g: f32) -> f32 {
    let g2 = g * g;
    let base = (1.0 + g2 - 2.0 * g * cos).max(PHASE_EPSILON);
    1.5 * ((1.0 - g2) / (2.0 + g2)) * (1.0 + cos * cos) / (base * base.sqrt())
}

/// Rayleigh phase function.
pub fn rayleigh_phase(cos: f32) -> f32 {
    0.75 * (1.0 + cos * cos)
}

/// Phase values sampled at every angular column for one asymmetry factor.
///
/// The table is a fixed-size array and is only ever rewritten in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseLut {
    entries: [PhaseEntry; ANGULAR_STEPS],
    g: f32,
}

impl PhaseLut {
    pub fn new(g: f32) -> Self {
        let mut lut = Self {
            entries: [PhaseEntry::default(); ANGULAR_STEPS],
            g,
        };
        lut.rebuild(g);
        lut
    }

    /// Re-evaluate every column for asymmetry `g`.
    pub fn rebuild(&mut self, g: f32) {
        self.g = g;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            let cos = angular_index_to_cos(i);
            *entry = PhaseEntry {
                mie: mie_phase(cos, g),
                rayleigh: rayleigh_phase(cos),
            };
        }
    }

    /// Asymmetry factor the table was built for.
    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn entries(&self) -> &[PhaseEntry; ANGULAR_STEPS] {
        &self.entries
    }

    /// Linearly interpolated phase values at `cos`.
    pub fn phase(&self, cos: f32) -> PhaseEntry {
        let (i0, i1, t) = split_index(cos_to_angular_index(cos), ANGULAR_STEPS);
        let a = self.entries[i0];
        let b = self.entries[i1];
        PhaseEntry {
            mie: a.mie + (b.mie - a.mie) * t,
            rayleigh: a.rayleigh + (b.rayleigh - a.rayleigh) * t,
        }
    }
}
