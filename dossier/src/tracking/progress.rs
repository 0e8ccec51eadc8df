//! Progress estimation for in-flight research requests.

use crate::errors::Error;
use crate::tracking::{DurationEstimator, RequestTracker, seconds_between};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A progress estimate for one in-flight request.
///
/// `fraction` is elapsed time over the expected duration. It is a statistical
/// estimate, never a completion percentage, and exceeds 1.0 for requests
/// running longer than the historical mean; that is meaningful ("slower than
/// usual"), not an error. `running_long` flips once elapsed time reaches the
/// expected duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressReport {
    pub fraction: f64,
    pub elapsed_seconds: f64,
    pub expected_seconds: f64,
    pub running_long: bool,
}

impl ProgressReport {
    /// Pure computation, separated from storage so it can be exercised with
    /// fixed instants.
    pub fn compute(started_at: DateTime<Utc>, now: DateTime<Utc>, expected_seconds: f64) -> Self {
        let elapsed_seconds = seconds_between(started_at, now);
        // The divisor is floored at one millisecond: a mean of zero (every
        // completion within clock resolution) must not produce a non-finite
        // fraction, which JSON cannot carry.
        let fraction = elapsed_seconds / expected_seconds.max(0.001);
        Self {
            fraction,
            elapsed_seconds,
            expected_seconds,
            running_long: elapsed_seconds >= expected_seconds,
        }
    }
}

/// Combines the tracker's start timestamps with the estimator's expected
/// duration to answer progress queries.
#[derive(Clone)]
pub struct ProgressEstimator {
    tracker: RequestTracker,
    estimator: Arc<dyn DurationEstimator>,
}

impl ProgressEstimator {
    pub fn new(tracker: RequestTracker, estimator: Arc<dyn DurationEstimator>) -> Self {
        Self { tracker, estimator }
    }

    /// Estimate progress for `token`.
    ///
    /// Returns [`Error::NotFound`] when no in-flight record exists: the
    /// token may never have existed, or its request may already have ended;
    /// the two are indistinguishable here.
    pub async fn estimate(&self, token: Uuid) -> Result<ProgressReport, Error> {
        let Some(started_at) = self.tracker.get_start(token).await? else {
            return Err(Error::NotFound {
                resource: "research request".to_string(),
                id: token.to_string(),
            });
        };

        let expected_seconds = self.estimator.expected_seconds().await?;
        Ok(ProgressReport::compute(started_at, Utc::now(), expected_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{DEFAULT_MEAN_SECONDS, RunningMean};
    use chrono::TimeDelta;
    use sqlx::PgPool;

    #[test]
    fn within_expected_window_still_reports_a_fraction() {
        let start = Utc::now();
        let now = start + TimeDelta::seconds(4);

        let report = ProgressReport::compute(start, now, 10.0);
        assert!((report.fraction - 0.4).abs() < 1e-9);
        assert!(!report.running_long);
    }

    #[test]
    fn past_expected_window_exceeds_one() {
        let start = Utc::now();
        let now = start + TimeDelta::seconds(15);

        let report = ProgressReport::compute(start, now, 10.0);
        assert!((report.fraction - 1.5).abs() < 1e-9);
        assert!(report.running_long);
    }

    #[test]
    fn running_long_flips_exactly_at_the_mean() {
        let start = Utc::now();
        let now = start + TimeDelta::seconds(10);

        let report = ProgressReport::compute(start, now, 10.0);
        assert!((report.fraction - 1.0).abs() < 1e-9);
        assert!(report.running_long);
    }

    #[test]
    fn clock_skew_clamps_to_zero_elapsed() {
        let start = Utc::now();
        let now = start - TimeDelta::seconds(2);

        let report = ProgressReport::compute(start, now, 10.0);
        assert_eq!(report.elapsed_seconds, 0.0);
        assert_eq!(report.fraction, 0.0);
        assert!(!report.running_long);
    }

    fn estimator(pool: &PgPool) -> ProgressEstimator {
        let running_mean = Arc::new(RunningMean::new(pool.clone()));
        let tracker = RequestTracker::new(pool.clone(), running_mean.clone());
        ProgressEstimator::new(tracker, running_mean)
    }

    async fn insert_started_ago(pool: &PgPool, token: Uuid, ago: TimeDelta) {
        sqlx::query("INSERT INTO research_requests (token, started_at) VALUES ($1, $2)")
            .bind(token)
            .bind(Utc::now() - ago)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test]
    async fn unknown_token_is_not_found(pool: PgPool) {
        let err = estimator(&pool).estimate(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[sqlx::test]
    async fn cold_start_uses_the_default_mean(pool: PgPool) {
        let token = Uuid::new_v4();
        insert_started_ago(&pool, token, TimeDelta::seconds(4)).await;

        let report = estimator(&pool).estimate(token).await.unwrap();
        assert_eq!(report.expected_seconds, DEFAULT_MEAN_SECONDS);
        assert!((report.fraction - 0.4).abs() < 0.05);
        assert!(!report.running_long);
    }

    #[sqlx::test]
    async fn long_running_request_reports_over_one(pool: PgPool) {
        let running_mean = RunningMean::new(pool.clone());
        for duration in [8.0, 12.0, 10.0] {
            running_mean.record(duration).await.unwrap();
        }

        let token = Uuid::new_v4();
        insert_started_ago(&pool, token, TimeDelta::seconds(15)).await;

        let report = estimator(&pool).estimate(token).await.unwrap();
        assert_eq!(report.expected_seconds, 10.0);
        assert!((report.fraction - 1.5).abs() < 0.05);
        assert!(report.running_long);
    }
}
