//! Archive coordinator: idempotent start, cooperative reset, snapshot reads.
//!
//! Every `Archiver` clone is a handle onto the same job record, so request
//! handlers each hold their own clone and all observe one job. The record sits
//! behind a `std::sync::Mutex` that is only held for the instant of a read or
//! write, never across the worker's sleeps.
//!
//! Cancellation is cooperative. Reset bumps the generation and returns at
//! once; the worker notices on its next check, at most one step delay later.
//! Until then its writes are rejected because its generation no longer
//! matches, so nothing it does is ever visible after the reset.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::state::{ArchiveSnapshot, ArchiveStatus, JobState};
use crate::config::ArchiveConfig;

/// Fixed name of the artifact a completed run refers to.
pub const ARTIFACT_NAME: &str = "contacts.json";

/// Handle to a spawned worker, tagged with the generation it writes for.
#[derive(Debug)]
pub struct ArchiveTask {
    generation: u64,
    handle: JoinHandle<()>,
}

impl ArchiveTask {
    /// Generation this worker is allowed to write for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the worker has exited, either finished or superseded.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

struct Shared {
    config: ArchiveConfig,
    state: Mutex<JobState>,
    /// Task for the current generation. Superseded tasks are detached, not aborted.
    task: Mutex<Option<ArchiveTask>>,
    /// Highest generation whose worker has exited.
    exited: watch::Sender<u64>,
}

/// Controller over the process-wide archive job.
#[derive(Clone)]
pub struct Archiver {
    shared: Arc<Shared>,
}

impl Archiver {
    /// Create the job record in the idle state.
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(JobState::new()),
                task: Mutex::new(None),
                exited: watch::channel(0).0,
            }),
        }
    }

    /// Start a run if the job is idle.
    ///
    /// Running or complete jobs are left alone. Returns whether a worker was
    /// spawned. Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut task = lock(&self.shared.task);
        let generation = {
            let mut state = lock(&self.shared.state);
            match state.begin() {
                Some(generation) => generation,
                None => {
                    debug!(status = %state.status, "Archive start ignored");
                    return false;
                }
            }
        };

        info!(
            generation,
            steps = self.shared.config.steps,
            step_delay = ?self.shared.config.step_delay,
            "Archive run started"
        );
        *task = Some(self.spawn_worker(generation));
        true
    }

    /// Return to idle with zero progress, whatever the current status.
    ///
    /// Does not wait for an in-flight worker; it stops at its next check.
    pub fn reset(&self) {
        let mut task = lock(&self.shared.task);
        let previous = {
            let mut state = lock(&self.shared.state);
            let previous = state.status;
            state.reset();
            previous
        };
        // Detach the superseded worker. It exits on its own.
        task.take();
        info!(from = %previous, "Archive reset");
    }

    /// Current status.
    pub fn status(&self) -> ArchiveStatus {
        lock(&self.shared.state).status
    }

    /// Current progress in `[0.0, 1.0]`.
    pub fn progress(&self) -> f64 {
        lock(&self.shared.state).progress
    }

    /// Status, progress, and timestamps read together.
    pub fn snapshot(&self) -> ArchiveSnapshot {
        lock(&self.shared.state).snapshot(ARTIFACT_NAME)
    }

    /// Name of the artifact a completed run refers to. Independent of status.
    pub fn artifact_name(&self) -> &'static str {
        ARTIFACT_NAME
    }

    /// Generation of the current worker, if one has been spawned and not superseded.
    pub fn current_generation(&self) -> Option<u64> {
        lock(&self.shared.task).as_ref().map(ArchiveTask::generation)
    }

    /// Whether a tracked worker is still running.
    pub fn worker_active(&self) -> bool {
        lock(&self.shared.task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Wait for the current generation's worker to exit.
    ///
    /// Returns at once when no worker is tracked. A reset issued while
    /// waiting does not wake this early; the worker still exits at its next
    /// check. The task handle stays in place, so dropping this future leaves
    /// the coordinator tracking the same worker.
    pub async fn wait_for_worker(&self) {
        let Some(generation) = self.current_generation() else {
            return;
        };
        let mut exited = self.shared.exited.subscribe();
        // Err only if the sender is gone, which cannot happen while `self` lives.
        let _ = exited.wait_for(|last| *last >= generation).await;
    }

    fn spawn_worker(&self, generation: u64) -> ArchiveTask {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            run_worker(&shared, generation).await;
            shared.exited.send_modify(|last| *last = (*last).max(generation));
        });
        ArchiveTask { generation, handle }
    }
}

async fn run_worker(shared: &Shared, generation: u64) {
    let steps = shared.config.steps.max(1);
    let delay = shared.config.step_delay;

    for step in 1..=steps {
        tokio::time::sleep(delay).await;
        let progress = f64::from(step) / f64::from(steps);
        if !lock(&shared.state).record_progress(generation, progress) {
            debug!(generation, step, "Archive worker superseded, exiting");
            return;
        }
        debug!(generation, progress, "Archive progress");
    }

    tokio::time::sleep(delay).await;
    if lock(&shared.state).complete(generation) {
        info!(generation, artifact = ARTIFACT_NAME, "Archive run complete");
    } else {
        debug!(generation, "Archive worker superseded before completion");
    }
}

/// The guarded data is always left consistent, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
