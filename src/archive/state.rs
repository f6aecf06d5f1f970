//! Archive job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// No run in progress. Initial state, and where every reset lands.
    Idle,
    /// A worker is advancing progress.
    Running,
    /// The last run finished. Stays here until reset.
    Complete,
}

impl ArchiveStatus {
    /// Check if this status allows transitioning to another status.
    ///
    /// Reset is allowed from anywhere, so every status may move to `Idle`.
    pub fn can_transition_to(&self, target: ArchiveStatus) -> bool {
        use ArchiveStatus::*;

        matches!(
            (self, target),
            (_, Idle) | (Idle, Running) | (Running, Complete)
        )
    }

    /// Whether a worker may be advancing state in this status.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// A consistent read of the job record at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSnapshot {
    pub status: ArchiveStatus,
    /// Fraction of the run completed, in `[0.0, 1.0]`.
    pub progress: f64,
    /// Generation of the authoritative worker (bumped on every start and reset).
    pub generation: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Artifact name, present only once the run is complete.
    pub artifact: Option<&'static str>,
}

/// The shared job record. Only ever touched under the coordinator's lock.
#[derive(Debug)]
pub(crate) struct JobState {
    pub status: ArchiveStatus,
    pub progress: f64,
    pub generation: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            status: ArchiveStatus::Idle,
            progress: 0.0,
            generation: 0,
            started_at: None,
            completed_at: None,
        }
    }

    /// Begin a new run. Returns the new generation, or `None` when not idle.
    pub fn begin(&mut self) -> Option<u64> {
        if !self.status.can_transition_to(ArchiveStatus::Running) {
            return None;
        }
        self.generation += 1;
        self.status = ArchiveStatus::Running;
        self.progress = 0.0;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        Some(self.generation)
    }

    /// Return to idle and invalidate any outstanding worker.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.status = ArchiveStatus::Idle;
        self.progress = 0.0;
        self.started_at = None;
        self.completed_at = None;
    }

    /// Record progress for `generation`. A stale generation leaves the record untouched.
    pub fn record_progress(&mut self, generation: u64, progress: f64) -> bool {
        if !self.owned_by(generation) {
            return false;
        }
        self.progress = progress.clamp(self.progress, 1.0);
        true
    }

    /// Mark the run owned by `generation` complete. A stale generation is a no-op.
    pub fn complete(&mut self, generation: u64) -> bool {
        if !self.owned_by(generation) {
            return false;
        }
        self.status = ArchiveStatus::Complete;
        self.progress = 1.0;
        self.completed_at = Some(Utc::now());
        true
    }

    fn owned_by(&self, generation: u64) -> bool {
        self.generation == generation && self.status.is_running()
    }

    pub fn snapshot(&self, artifact: &'static str) -> ArchiveSnapshot {
        ArchiveSnapshot {
            status: self.status,
            progress: self.progress,
            generation: self.generation,
            started_at: self.started_at,
            completed_at: self.completed_at,
            artifact: (self.status == ArchiveStatus::Complete).then_some(artifact),
        }
    }
}
