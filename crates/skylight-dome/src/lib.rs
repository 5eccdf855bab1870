//! Time-sliced sky-dome recomputation.
//!
//! [`SkyScheduler`] spreads the evaluation of a 64 x 32 hemisphere of
//! [`skylight_optics::OpticalModel`] samples over many frames. Each sweep
//! writes into the back half of a [`DoubleBuffer`] on a [`JobExecutor`];
//! when a sweep completes its derived colours are finalised and the
//! buffers swap, so renderers only ever see a whole dome through
//! [`SkyLightRenderParams`].

mod condition;
mod double_buffer;
mod executor;
mod params;
mod progress;
mod scheduler;
mod sweep;
mod texture;

#[cfg(test)]
mod test_support;

pub use condition::SkyDomeCondition;
pub use double_buffer::{BufferIndex, BufferSlot, DoubleBuffer};
pub use executor::{InlineExecutor, Job, JobExecutor, WorkerExecutor};
pub use params::{SkyDomeFrame, SkyLightConstants, SkyLightRenderParams, SkyLightUniform};
pub use progress::{HEMISPHERE_BUCKETS, HemisphereBucket, SweepProgress, hemisphere_bucket};
pub use scheduler::{SchedulerState, SkyScheduler, texel_budget};
pub use sweep::texel_direction;
pub use texture::{DOME_HEIGHT, DOME_ROW_PITCH, DOME_TEXELS, DOME_WIDTH, Half4, SkyDomeTexture};
