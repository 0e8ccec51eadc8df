//! Data models for the progress tracking subsystem.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The shared duration statistics row.
///
/// `mean_seconds` is only meaningful once `completed_count > 0`; readers use
/// [`crate::tracking::DEFAULT_MEAN_SECONDS`] until then.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct DurationStats {
    /// Arithmetic mean of all completed-request durations, in seconds
    pub mean_seconds: f64,
    /// Number of durations folded into the mean
    pub completed_count: i64,
}
