//! Archive job: a single simulated export run with pollable progress.
//!
//! Core components:
//! - `state`: status enum, snapshot type, and the shared job record
//! - `coordinator`: `Archiver`, the start/reset/query surface and its worker
//! - `routes`: HTTP endpoints for polling, control, and artifact download

pub mod coordinator;
pub mod routes;
pub mod state;

pub use coordinator::{ARTIFACT_NAME, ArchiveTask, Archiver};
pub use routes::{ArchiveRouteState, archive_routes};
pub use state::{ArchiveSnapshot, ArchiveStatus};
