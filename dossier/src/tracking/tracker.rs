//! Start/end lifecycle tracking for research requests.

use crate::errors::Error;
use crate::tracking::{DurationEstimator, seconds_between};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Records when research requests begin and removes the record when they end.
///
/// The tracker is a stateless layer over the shared `research_requests`
/// table; clones are cheap and interchangeable. A token's record exists
/// exactly while its request is in flight.
#[derive(Clone)]
pub struct RequestTracker {
    db: PgPool,
    estimator: Arc<dyn DurationEstimator>,
}

impl RequestTracker {
    pub fn new(db: PgPool, estimator: Arc<dyn DurationEstimator>) -> Self {
        Self { db, estimator }
    }

    /// Store the current wall-clock time under `token` and return a guard
    /// that guarantees the record is removed again.
    ///
    /// Callers must use one token per concurrent request; a repeated token
    /// overwrites the earlier record.
    pub async fn begin(&self, token: Uuid) -> Result<TrackingGuard, Error> {
        sqlx::query(
            r#"
            INSERT INTO research_requests (token, started_at)
            VALUES ($1, $2)
            ON CONFLICT (token) DO UPDATE SET started_at = EXCLUDED.started_at
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to record request start: {e}"))?;

        Ok(TrackingGuard {
            tracker: self.clone(),
            token,
            released: false,
        })
    }

    /// The stored start timestamp for `token`, or `None` if the request never
    /// began or has already ended. Absence is a normal outcome, not an error.
    pub async fn get_start(&self, token: Uuid) -> Result<Option<DateTime<Utc>>, Error> {
        let started_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT started_at FROM research_requests WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to fetch request start: {e}"))?;

        Ok(started_at)
    }

    /// End a successful request: remove its record and fold the observed
    /// duration into the estimator.
    ///
    /// The `DELETE .. RETURNING` claims the record atomically, so of any
    /// number of concurrent duplicate calls exactly one folds the duration;
    /// the rest are no-ops. A token that was never begun is likewise a no-op.
    pub async fn complete(&self, token: Uuid) -> Result<(), Error> {
        let started_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            DELETE FROM research_requests WHERE token = $1 RETURNING started_at
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to remove request record: {e}"))?;

        if let Some(started_at) = started_at {
            let duration = seconds_between(started_at, Utc::now());
            self.estimator.record(duration).await?;
        }

        Ok(())
    }

    /// End a failed, timed-out, or cancelled request: remove its record
    /// without folding the duration (failure latency would skew the mean;
    /// the estimator predicts successful report generation).
    pub async fn abandon(&self, token: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            DELETE FROM research_requests WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.db)
        .await
        .map_err(|e| anyhow::anyhow!("failed to remove request record: {e}"))?;

        Ok(())
    }
}

/// Guarantees the tracking record created by [`RequestTracker::begin`] is
/// removed on every exit path.
///
/// Consume the guard with [`complete`](TrackingGuard::complete) or
/// [`abandon`](TrackingGuard::abandon). If it is dropped without either
/// (the handler future was cancelled, or a panic unwound), it spawns an
/// `abandon` so the token does not leak in the store.
#[must_use = "dropping the guard abandons the request in the background"]
pub struct TrackingGuard {
    tracker: RequestTracker,
    token: Uuid,
    released: bool,
}

impl TrackingGuard {
    /// Release the record and fold the request's duration into the mean.
    pub async fn complete(mut self) -> Result<(), Error> {
        self.released = true;
        let tracker = self.tracker.clone();
        let token = self.token;
        drop(self);
        tracker.complete(token).await
    }

    /// Release the record without folding the duration.
    pub async fn abandon(mut self) -> Result<(), Error> {
        self.released = true;
        let tracker = self.tracker.clone();
        let token = self.token;
        drop(self);
        tracker.abandon(token).await
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let tracker = self.tracker.clone();
        let token = self.token;
        tokio::spawn(async move {
            if let Err(e) = tracker.abandon(token).await {
                tracing::warn!("failed to release tracking record for {token}: {e}");
            }
        });
    }
}
