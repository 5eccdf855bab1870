//! Where sweep jobs run.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, SendError, Sender};

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs at most one [`Job`] at a time on behalf of the scheduler.
pub trait JobExecutor {
    /// Begin running `job`. The previous job must have been waited for.
    fn start(&mut self, job: Job);

    /// Block until the started job has finished. Returns at once if none is
    /// outstanding.
    fn wait(&mut self);

    /// Wait for the outstanding job and drop any leftover completion state.
    fn reset(&mut self);
}

/// Runs jobs synchronously inside [`start`](JobExecutor::start).
#[derive(Debug, Default)]
pub struct InlineExecutor {
    jobs_run: usize,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs executed so far.
    pub fn jobs_run(&self) -> usize {
        self.jobs_run
    }
}

impl JobExecutor for InlineExecutor {
    fn start(&mut self, job: Job) {
        self.jobs_run += 1;
        job();
    }

    fn wait(&mut self) {}

    fn reset(&mut self) {}
}

/// Runs jobs on one dedicated, named background thread.
///
/// Jobs are handed over a bounded channel and the worker acknowledges each
/// one on a completion channel, which [`wait`](JobExecutor::wait) drains.
pub struct WorkerExecutor {
    /// Channel sender for submitting jobs (dropped on shutdown).
    job_sender: Option<Sender<Job>>,
    /// One message per finished job.
    done_receiver: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    outstanding: bool,
}

impl WorkerExecutor {
    pub const THREAD_NAME: &'static str = "sky-dome-worker";

    /// Spawn the worker thread.
    pub fn new() -> std::io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let handle = std::thread::Builder::new()
            .name(Self::THREAD_NAME.into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    job();
                    if done_tx.send(()).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            job_sender: Some(job_tx),
            done_receiver: done_rx,
            handle: Some(handle),
            outstanding: false,
        })
    }

    /// True while a started job has not been waited for.
    pub fn is_busy(&self) -> bool {
        self.outstanding
    }

    /// Finish the outstanding job, then stop and join the worker thread.
    pub fn shutdown(&mut self) {
        self.wait();
        self.job_sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("Sky dome worker thread panicked");
        }
    }
}

impl JobExecutor for WorkerExecutor {
    fn start(&mut self, job: Job) {
        debug_assert!(!self.outstanding, "sky dome job started while another is running");
        let Some(sender) = &self.job_sender else {
            job();
            return;
        };
        match sender.send(job) {
            Ok(()) => self.outstanding = true,
            Err(SendError(job)) => {
                tracing::warn!("Sky dome worker is gone; running job on the calling thread");
                job();
            }
        }
    }

    fn wait(&mut self) {
        if !self.outstanding {
            return;
        }
        self.outstanding = false;
        if self.done_receiver.recv().is_err() {
            tracing::warn!("Sky dome worker exited before finishing its job");
        }
    }

    fn reset(&mut self) {
        self.wait();
        while self.done_receiver.try_recv().is_ok() {}
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
