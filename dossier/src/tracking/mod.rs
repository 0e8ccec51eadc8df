//! Progress tracking for in-flight research requests.
//!
//! This is the stateful core of the service. It is split into three pieces
//! that share PostgreSQL as their only state:
//!
//! - [`tracker`]: records when a request started and removes the record when
//!   it ends, on every exit path (success, upstream failure, cancellation).
//! - [`estimator`]: maintains a running mean of completed-request durations
//!   behind the [`estimator::DurationEstimator`] trait, so the averaging
//!   policy can be swapped without touching callers.
//! - [`progress`]: turns a start timestamp plus the current mean into a
//!   progress estimate for the query endpoint.
//!
//! All state lives in the database, never in the process, so any number of
//! server instances can begin, end, and query requests interchangeably.

pub mod estimator;
pub mod models;
pub mod progress;
pub mod tracker;

pub use estimator::{DEFAULT_MEAN_SECONDS, DurationEstimator, RunningMean};
pub use progress::{ProgressEstimator, ProgressReport};
pub use tracker::{RequestTracker, TrackingGuard};

use chrono::{DateTime, Utc};

/// Elapsed seconds between two instants, clamped at zero. Clock skew between
/// server instances can make `end < start` for very short requests.
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_milliseconds() as f64 / 1000.0).max(0.0)
}
