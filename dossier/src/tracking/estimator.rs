//! Running-mean duration estimation for completed research requests.

use crate::errors::Error;
use crate::tracking::models::DurationStats;
use async_trait::async_trait;
use sqlx::PgPool;

/// Expected duration reported before any request has completed.
///
/// A placeholder, not derived from data: with zero observations there is
/// nothing to average, and report generation has historically landed near
/// this figure.
pub const DEFAULT_MEAN_SECONDS: f64 = 10.0;

/// Averaging policy for completed-request durations.
///
/// Callers hold `Arc<dyn DurationEstimator>` so the policy can be replaced
/// (e.g. by a sliding-window variant) without changing the tracker, the
/// progress computation, or the handlers. [`RunningMean`] is the shipped
/// implementation.
#[async_trait]
pub trait DurationEstimator: Send + Sync {
    /// The duration a new request is expected to take, in seconds.
    async fn expected_seconds(&self) -> Result<f64, Error>;

    /// Fold one observed duration into the estimate.
    async fn record(&self, duration_seconds: f64) -> Result<(), Error>;

    /// Number of durations folded so far.
    async fn completed_count(&self) -> Result<i64, Error>;
}

/// Unbounded incremental mean over every duration recorded since the stats
/// row was created.
///
/// Every completed request weighs equally, forever; there is no windowing,
/// decay, or outlier rejection. That makes the estimate sluggish once the
/// count grows large.
// TODO: add a sliding-window implementation so old deployments stop
// dominating the estimate.
#[derive(Debug, Clone)]
pub struct RunningMean {
    db: PgPool,
}

impl RunningMean {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn stats(&self) -> Result<DurationStats, Error> {
        let stats = sqlx::query_as::<_, DurationStats>(
            r#"
            SELECT mean_seconds, completed_count FROM duration_stats
            "#,
        )
        .fetch_one(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read duration stats: {e}"))?;

        Ok(stats)
    }
}

#[async_trait]
impl DurationEstimator for RunningMean {
    async fn expected_seconds(&self) -> Result<f64, Error> {
        let stats = self.stats().await?;
        if stats.completed_count == 0 {
            Ok(DEFAULT_MEAN_SECONDS)
        } else {
            Ok(stats.mean_seconds)
        }
    }

    /// Applies `new_mean = (old_mean * n + duration) / (n + 1)` and bumps `n`,
    /// in one statement. The row lock serializes concurrent folds, so two
    /// requests completing at once cannot both read the same `n` and drop one
    /// contribution. The stored mean starts at 0, which makes the first fold
    /// degenerate to `new_mean = duration` with no special case.
    async fn record(&self, duration_seconds: f64) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE duration_stats
            SET mean_seconds = (mean_seconds * completed_count + $1) / (completed_count + 1),
                completed_count = completed_count + 1
            "#,
        )
        .bind(duration_seconds.max(0.0))
        .execute(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to record duration: {e}"))?;

        Ok(())
    }

    async fn completed_count(&self) -> Result<i64, Error> {
        Ok(self.stats().await?.completed_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn default_mean_before_any_completion(pool: PgPool) {
        let estimator = RunningMean::new(pool);
        assert_eq!(estimator.expected_seconds().await.unwrap(), DEFAULT_MEAN_SECONDS);
        assert_eq!(estimator.completed_count().await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn mean_matches_arithmetic_mean(pool: PgPool) {
        let estimator = RunningMean::new(pool);

        for duration in [8.0, 12.0, 10.0] {
            estimator.record(duration).await.unwrap();
        }

        let mean = estimator.expected_seconds().await.unwrap();
        assert!((mean - 10.0).abs() < 1e-9, "expected mean 10.0, got {mean}");
        assert_eq!(estimator.completed_count().await.unwrap(), 3);
    }

    #[sqlx::test]
    async fn first_fold_ignores_cold_start_default(pool: PgPool) {
        let estimator = RunningMean::new(pool);

        // If the 10.0 fallback leaked into the arithmetic, a single 2.0s
        // observation would not average to exactly 2.0.
        estimator.record(2.0).await.unwrap();
        assert_eq!(estimator.expected_seconds().await.unwrap(), 2.0);
    }

    #[sqlx::test]
    async fn negative_durations_are_clamped(pool: PgPool) {
        let estimator = RunningMean::new(pool);

        estimator.record(-5.0).await.unwrap();
        assert_eq!(estimator.expected_seconds().await.unwrap(), 0.0);
        assert_eq!(estimator.completed_count().await.unwrap(), 1);
    }

    #[sqlx::test]
    async fn concurrent_records_lose_no_updates(pool: PgPool) {
        const TASKS: usize = 16;
        const DURATION: f64 = 2.5;

        let mut handles = Vec::with_capacity(TASKS);
        for _ in 0..TASKS {
            let estimator = RunningMean::new(pool.clone());
            handles.push(tokio::spawn(async move { estimator.record(DURATION).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let estimator = RunningMean::new(pool);
        assert_eq!(estimator.completed_count().await.unwrap(), TASKS as i64);
        let mean = estimator.expected_seconds().await.unwrap();
        assert!((mean - DURATION).abs() < 1e-9, "expected mean {DURATION}, got {mean}");
    }
}
