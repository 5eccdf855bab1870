//! Owner of the dome double buffer and the sweep state machine.

use crossbeam_channel::{Receiver, Sender};
use skylight_optics::OpticalModel;

use crate::condition::SkyDomeCondition;
use crate::double_buffer::{BufferIndex, DoubleBuffer};
use crate::executor::JobExecutor;
use crate::params::{SkyDomeFrame, SkyLightRenderParams};
use crate::sweep::SweepState;
use crate::texture::{DOME_TEXELS, SkyDomeTexture};

/// Whether a sweep is under way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No job in flight and the current sweep is untouched or finished.
    Idle,
    /// A job is running or the current sweep is partially computed.
    Sweeping,
}

/// Texels to compute in one frame for `ratio_percent` of the dome.
pub fn texel_budget(ratio_percent: f32) -> usize {
    let texels = (DOME_TEXELS as f32 * ratio_percent / 100.0).round();
    (texels as usize).clamp(1, DOME_TEXELS)
}

/// Returned by a job: the state it borrowed plus whether it finished.
struct SweepOutcome {
    sweep: SweepState,
    back: SkyDomeFrame,
    completed: bool,
}

/// Time-slices dome evaluation across frames and publishes finished domes.
///
/// The sweep state and back frame are moved into each job and come back over
/// a channel; they are only ever touched by one thread at a time. Results
/// are collected on the owning thread by [`sync`](Self::sync) or
/// [`poll`](Self::poll), which is also where a finished sweep swaps buffers.
pub struct SkyScheduler<E: JobExecutor> {
    executor: E,
    frames: DoubleBuffer<SkyDomeFrame>,
    /// `None` while lent to a job.
    sweep: Option<SweepState>,
    result_sender: Sender<SweepOutcome>,
    result_receiver: Receiver<SweepOutcome>,
    in_flight: bool,
    /// Condition the next sweep will use.
    requested: SkyDomeCondition,
    last_frame_id: Option<u64>,
    completed_sweeps: i64,
    /// Model settings used if a job is lost and the sweep must be rebuilt.
    model_template: OpticalModel,
}

impl<E: JobExecutor> SkyScheduler<E> {
    /// Scheduler with the model's current state as both the requested and
    /// in-progress condition. Nothing is computed until the first update.
    pub fn new(model: OpticalModel, executor: E) -> Self {
        let condition = SkyDomeCondition::from_state(model.state());
        let (result_sender, result_receiver) = crossbeam_channel::bounded(1);
        Self {
            executor,
            frames: DoubleBuffer::new(SkyDomeFrame::new(), SkyDomeFrame::new()),
            sweep: Some(SweepState::new(model.clone(), condition)),
            result_sender,
            result_receiver,
            in_flight: false,
            requested: condition,
            last_frame_id: None,
            completed_sweeps: 0,
            model_template: model,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Restart the sweep with the requested condition and compute all of it
    /// in one job.
    pub fn full_update(&mut self) {
        self.sync();
        let requested = self.requested;
        if let Some(sweep) = self.sweep.as_mut() {
            sweep.restart(requested);
        }
        self.submit(DOME_TEXELS);
    }

    /// Advance the sweep by `ratio_per_frame` percent of the dome.
    ///
    /// Runs at most once per `frame_id`. The requested condition is adopted
    /// when a sweep starts; a finished sweep only restarts when a different
    /// condition has been requested.
    pub fn incremental_update(&mut self, ratio_per_frame: f32, frame_id: u64) {
        if self.last_frame_id == Some(frame_id) {
            return;
        }
        self.last_frame_id = Some(frame_id);
        self.sync();

        let requested = self.requested;
        let Some(sweep) = self.sweep.as_mut() else {
            return;
        };
        if sweep.progress.is_complete() {
            if sweep.condition == requested {
                return;
            }
            sweep.restart(requested);
        } else if sweep.progress.texels_computed == 0 {
            // Nothing computed yet: this is the start of the sweep.
            sweep.restart(requested);
        }
        self.submit(texel_budget(ratio_per_frame));
    }

    /// Block until the in-flight job, if any, has finished and apply its
    /// result.
    pub fn sync(&mut self) {
        if !self.in_flight {
            return;
        }
        self.executor.wait();
        match self.result_receiver.try_recv() {
            Ok(outcome) => self.collect(outcome),
            Err(_) => self.recover_lost_sweep(),
        }
    }

    /// Apply a finished job's result without blocking. Returns `true` if one
    /// was collected.
    pub fn poll(&mut self) -> bool {
        if !self.in_flight {
            return false;
        }
        match self.result_receiver.try_recv() {
            Ok(outcome) => {
                self.executor.wait();
                self.collect(outcome);
                true
            }
            Err(_) => false,
        }
    }

    /// Set the march stride (1 or 2). A change restarts the current sweep.
    pub fn set_quality(&mut self, quality: u32) {
        let step = quality.clamp(1, 2);
        self.sync();
        self.model_template.set_integration_step(step);
        if let Some(sweep) = self.sweep.as_mut()
            && sweep.model.integration_step() != step
        {
            sweep.model.set_integration_step(step);
            sweep.progress.reset();
        }
    }

    pub fn quality(&self) -> u32 {
        self.model_template.integration_step()
    }

    /// Request `condition` for the next sweep.
    pub fn set_sky_dome_condition(&mut self, condition: SkyDomeCondition) {
        self.requested = condition;
    }

    /// The requested condition.
    pub fn sky_dome_condition(&self) -> SkyDomeCondition {
        self.requested
    }

    /// Request `condition`, and with `force_immediate` recompute the whole
    /// dome right away.
    pub fn set_sky_light_parameters(&mut self, condition: SkyDomeCondition, force_immediate: bool) {
        self.set_sky_dome_condition(condition);
        if force_immediate {
            self.full_update();
        }
    }

    /// Whether the requested condition differs from the one being computed.
    pub fn is_update_pending(&mut self) -> bool {
        self.sync();
        self.sweep
            .as_ref()
            .is_some_and(|sweep| sweep.condition != self.requested)
    }

    /// Texels computed in the current sweep. Waits for the in-flight job.
    pub fn progress(&mut self) -> usize {
        self.sync();
        self.sweep
            .as_ref()
            .map_or(0, |sweep| sweep.progress.texels_computed)
    }

    pub fn state(&self) -> SchedulerState {
        if self.in_flight {
            return SchedulerState::Sweeping;
        }
        match &self.sweep {
            Some(sweep)
                if sweep.progress.texels_computed > 0 && !sweep.progress.is_complete() =>
            {
                SchedulerState::Sweeping
            }
            _ => SchedulerState::Idle,
        }
    }

    pub fn front_index(&self) -> BufferIndex {
        self.frames.front_index()
    }

    /// Snapshot of the front dome, after collecting any finished job.
    pub fn render_params(&mut self) -> SkyLightRenderParams<'_> {
        self.poll();
        SkyLightRenderParams::new(self.frames.front())
    }

    /// Bytes held by both dome textures and the optical tables.
    pub fn memory_usage(&self) -> usize {
        2 * SkyDomeTexture::BYTES + self.model_template.memory_usage()
    }

    fn submit(&mut self, budget: usize) {
        let Some(mut sweep) = self.sweep.take() else {
            return;
        };
        let mut back = self.frames.take_back();
        let sender = self.result_sender.clone();
        let timestamp = self.completed_sweeps + 1;

        self.in_flight = true;
        self.executor.start(Box::new(move || {
            let completed = sweep.step(&mut back, budget, timestamp);
            let _ = sender.send(SweepOutcome {
                sweep,
                back,
                completed,
            });
        }));
    }

    fn collect(&mut self, outcome: SweepOutcome) {
        self.in_flight = false;
        self.frames.restore_back(outcome.back);
        self.sweep = Some(outcome.sweep);
        if outcome.completed {
            self.completed_sweeps += 1;
            self.frames.swap();
            tracing::debug!(
                "Sky dome sweep {} complete, front buffer {:?}",
                self.completed_sweeps,
                self.frames.front_index()
            );
        }
    }

    fn recover_lost_sweep(&mut self) {
        tracing::warn!("Sky dome job produced no result; restarting the sweep");
        self.in_flight = false;
        self.executor.reset();
        self.frames.restore_back(SkyDomeFrame::new());
        self.sweep = Some(SweepState::new(self.model_template.clone(), self.requested));
    }
}

impl<E: JobExecutor> Drop for SkyScheduler<E> {
    fn drop(&mut self) {
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{InlineExecutor, Job};
    use crate::test_support::shared_luts;
    use glam::Vec3;

    fn scheduler() -> SkyScheduler<InlineExecutor> {
        SkyScheduler::new(OpticalModel::new(shared_luts()), InlineExecutor::new())
    }

    fn other_condition(s: &SkyScheduler<InlineExecutor>, sun: Vec3) -> SkyDomeCondition {
        SkyDomeCondition {
            sun_direction: sun,
            ..s.sky_dome_condition()
        }
    }

    /// Drops every job without running it.
    struct LosingExecutor;

    impl JobExecutor for LosingExecutor {
        fn start(&mut self, _job: Job) {}
        fn wait(&mut self) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn test_budget_rounding() {
        assert_eq!(texel_budget(0.12), 2);
        assert_eq!(texel_budget(50.0), 1024);
        assert_eq!(texel_budget(100.0), DOME_TEXELS);
        assert_eq!(texel_budget(400.0), DOME_TEXELS);
        assert_eq!(texel_budget(0.0), 1);
        assert_eq!(texel_budget(-5.0), 1);
        assert_eq!(texel_budget(f32::NAN), 1);
    }

    #[test]
    fn test_initial_state() {
        let mut s = scheduler();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.front_index(), BufferIndex::Zero);
        assert_eq!(s.progress(), 0);
        assert!(!s.is_update_pending());
        assert_eq!(s.render_params().texture_timestamp, -1);
    }

    #[test]
    fn test_full_update_swaps_and_publishes() {
        let mut s = scheduler();
        s.full_update();
        assert_eq!(s.progress(), DOME_TEXELS);
        assert_eq!(s.front_index(), BufferIndex::One);
        assert_eq!(s.state(), SchedulerState::Idle);

        let params = s.render_params();
        assert_eq!(params.texture_timestamp, 1);
        assert!(params.mie_texels.iter().all(|t| t.a == half::f16::ONE));
        assert!(params.constants.sky_color_top.min_element() > 0.0);
    }

    #[test]
    fn test_complete_sweep_ignores_further_updates() {
        let mut s = scheduler();
        s.full_update();
        s.sync();
        let jobs = s.executor().jobs_run();
        for frame in 0..5 {
            s.incremental_update(10.0, frame);
        }
        assert_eq!(s.executor().jobs_run(), jobs);
        assert_eq!(s.progress(), DOME_TEXELS);
        assert_eq!(s.front_index(), BufferIndex::One);
    }

    #[test]
    fn test_front_index_alternates_per_sweep() {
        let mut s = scheduler();
        for n in 1..=5usize {
            let sun = Vec3::new(n as f32, 0.0, 1.0);
            let condition = other_condition(&s, sun);
            s.set_sky_light_parameters(condition, true);
            s.sync();
            assert_eq!(s.front_index().as_usize(), n % 2);
            assert_eq!(s.render_params().texture_timestamp, n as i64);
        }
    }

    #[test]
    fn test_same_frame_id_is_deduplicated() {
        let mut s = scheduler();
        s.incremental_update(50.0, 7);
        assert_eq!(s.progress(), 1024);
        assert_eq!(s.executor().jobs_run(), 1);
        assert_eq!(s.state(), SchedulerState::Sweeping);

        s.incremental_update(50.0, 7);
        assert_eq!(s.progress(), 1024);
        assert_eq!(s.executor().jobs_run(), 1);

        s.incremental_update(50.0, 8);
        assert_eq!(s.progress(), DOME_TEXELS);
        assert_eq!(s.front_index(), BufferIndex::One);
    }

    #[test]
    fn test_incremental_sweep_matches_full_sweep() {
        let mut a = scheduler();
        a.full_update();
        let full: Vec<_> = a.render_params().mie_texels.to_vec();

        let mut b = scheduler();
        let mut frame = 0;
        while b.render_params().texture_timestamp < 1 {
            b.incremental_update(7.0, frame);
            frame += 1;
        }
        assert_eq!(b.render_params().mie_texels, full.as_slice());
        // ceil(2048 / 143) jobs.
        assert_eq!(b.executor().jobs_run(), 15);
    }

    #[test]
    fn test_request_mid_sweep_waits_for_next_sweep() {
        let mut s = scheduler();
        let original = s.sky_dome_condition();
        s.incremental_update(50.0, 1);

        let changed = other_condition(&s, Vec3::X + Vec3::Z);
        s.set_sky_dome_condition(changed);
        assert!(s.is_update_pending());
        assert_eq!(s.sky_dome_condition(), changed);

        // Finishing the sweep still uses the original condition.
        s.incremental_update(50.0, 2);
        assert_eq!(s.progress(), DOME_TEXELS);
        let published = s.render_params().constants.sun_direction.truncate();
        assert!((published - original.sun_direction).length() < 1e-6);

        // The next frame promotes the request and restarts.
        s.incremental_update(50.0, 3);
        assert_eq!(s.progress(), 1024);
        assert!(!s.is_update_pending());
    }

    #[test]
    fn test_request_before_first_sweep_is_used() {
        let mut s = scheduler();
        let sun = Vec3::new(1.0, 0.0, 0.0);
        let condition = other_condition(&s, sun);
        s.set_sky_dome_condition(condition);
        s.incremental_update(100.0, 1);
        assert!(!s.is_update_pending());
        let published = s.render_params().constants.sun_direction.truncate();
        assert!((published - sun).length() < 1e-6);
    }

    #[test]
    fn test_set_quality_resets_only_on_change() {
        let mut s = scheduler();
        s.incremental_update(10.0, 1);
        let done = s.progress();
        assert!(done > 0);

        s.set_quality(1);
        assert_eq!(s.progress(), done);

        s.set_quality(5);
        assert_eq!(s.quality(), 2);
        assert_eq!(s.progress(), 0);

        s.set_quality(2);
        s.incremental_update(10.0, 2);
        let again = s.progress();
        s.set_quality(2);
        assert_eq!(s.progress(), again);
    }

    #[test]
    fn test_force_immediate_applies_condition() {
        let mut s = scheduler();
        let sun = Vec3::new(0.0, 1.0, 1.0);
        let condition = other_condition(&s, sun);
        s.set_sky_light_parameters(condition, false);
        assert_eq!(s.progress(), 0);

        s.set_sky_light_parameters(condition, true);
        let published = s.render_params().constants.sun_direction.truncate();
        assert!((published - sun.normalize()).length() < 1e-6);
    }

    #[test]
    fn test_memory_usage() {
        let s = scheduler();
        let luts = shared_luts();
        assert_eq!(
            s.memory_usage(),
            2 * SkyDomeTexture::BYTES + 256 * 8 + luts.memory_usage()
        );
    }

    #[test]
    fn test_lost_job_is_recovered() {
        let mut s = SkyScheduler::new(OpticalModel::new(shared_luts()), LosingExecutor);
        s.set_quality(2);
        s.full_update();
        s.sync();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.progress(), 0);
        assert_eq!(s.quality(), 2);
        assert_eq!(s.front_index(), BufferIndex::Zero);
    }
}
