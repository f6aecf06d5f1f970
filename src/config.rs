//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default listen port.
const DEFAULT_PORT: u16 = 8080;
/// Default number of archive steps.
const DEFAULT_ARCHIVE_STEPS: u32 = 10;
/// Default per-step archive delay in milliseconds.
const DEFAULT_ARCHIVE_STEP_MS: u64 = 1000;

/// Archive job timing.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Number of progress steps per run. Always at least 1.
    pub steps: u32,
    /// Delay before each step and before the final completion.
    pub step_delay: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_ARCHIVE_STEPS,
            step_delay: Duration::from_millis(DEFAULT_ARCHIVE_STEP_MS),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds on.
    pub port: u16,
    /// Directory holding the contacts file (also the archive artifact).
    pub data_dir: PathBuf,
    /// Archive job timing.
    pub archive: ArchiveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("."),
            archive: ArchiveConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults. A zero step count is
    /// rejected since a run needs at least one step to make progress.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: u16 = lookup("CONTACTS_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_dir = lookup("CONTACTS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let steps: u32 = lookup("CONTACTS_ARCHIVE_STEPS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_ARCHIVE_STEPS);
        if steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONTACTS_ARCHIVE_STEPS".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let step_ms: u64 = lookup("CONTACTS_ARCHIVE_STEP_MS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_ARCHIVE_STEP_MS);

        Ok(Self {
            port,
            data_dir,
            archive: ArchiveConfig {
                steps,
                step_delay: Duration::from_millis(step_ms),
            },
        })
    }
}
