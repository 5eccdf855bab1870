//! Sweep bookkeeping: texel counter and running colour accumulators.

use glam::Vec3;

use crate::texture::{DOME_HEIGHT, DOME_TEXELS, DOME_WIDTH};

pub const HEMISPHERE_BUCKETS: usize = 5;

/// log2 of a quarter of the dome width.
const LON_SHIFT: u32 = (DOME_WIDTH / 4).trailing_zeros();
/// log2 of half the dome height.
const LAT_SHIFT: u32 = (DOME_HEIGHT / 2).trailing_zeros();

/// Averaged sky colour regions, in bucket order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HemisphereBucket {
    Top = 0,
    North = 1,
    East = 2,
    South = 3,
    West = 4,
}

/// Bucket for texel `(x, y)`.
///
/// The upper half of the rows all land in [`HemisphereBucket::Top`]; the
/// lower half is split into four longitude quarters.
pub const fn hemisphere_bucket(x: usize, y: usize) -> usize {
    let lat_idx = y >> LAT_SHIFT;
    let lon_idx = x >> LON_SHIFT;
    let bucket = lat_idx * lon_idx + lat_idx;
    debug_assert!(bucket < HEMISPHERE_BUCKETS);
    bucket
}

const fn bucket_texel_counts() -> [usize; HEMISPHERE_BUCKETS] {
    let mut counts = [0; HEMISPHERE_BUCKETS];
    let mut i = 0;
    while i < DOME_TEXELS {
        counts[hemisphere_bucket(i % DOME_WIDTH, i / DOME_WIDTH)] += 1;
        i += 1;
    }
    counts
}

/// Number of texels feeding each bucket.
pub(crate) const BUCKET_TEXEL_COUNTS: [usize; HEMISPHERE_BUCKETS] = bucket_texel_counts();

/// Progress of the sweep currently being computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepProgress {
    /// Texels written so far, `0..=DOME_TEXELS`.
    pub texels_computed: usize,
    /// Sum of in-scattering over the haze row.
    pub haze: Vec3,
    pub haze_mie_no_premul: Vec3,
    pub haze_rayleigh_no_premul: Vec3,
    /// Sum of in-scattering per hemisphere bucket.
    pub hemisphere: [Vec3; HEMISPHERE_BUCKETS],
}

impl SweepProgress {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        self.texels_computed >= DOME_TEXELS
    }

    /// Hemisphere sums divided by their texel counts.
    pub fn hemisphere_averages(&self) -> [Vec3; HEMISPHERE_BUCKETS] {
        let mut averages = self.hemisphere;
        for (avg, count) in averages.iter_mut().zip(BUCKET_TEXEL_COUNTS) {
            *avg *= 1.0 / count as f32;
        }
        averages
    }
}
