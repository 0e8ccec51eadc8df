//! Request and response payloads for the HTTP API.

use crate::tracking::ProgressReport;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request payload for the company research endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    /// The name of the company to research
    pub company_name: String,
    /// Caller-supplied token identifying this request for progress queries.
    /// Must be unique per concurrent request (a random v4 UUID).
    #[schema(value_type = String, format = "uuid")]
    pub token: Uuid,
}

/// Response payload for the company research endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchResponse {
    /// The generated research report
    pub report: String,
}

/// Progress estimate for an in-flight research request.
///
/// `fraction` is elapsed time over the expected (historical mean) duration -
/// a statistical estimate, not a completion percentage. Values above 1.0 mean
/// the request is running longer than usual, which `running_long` also flags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressResponse {
    /// Elapsed time divided by the expected duration; may exceed 1.0
    pub fraction: f64,
    /// Seconds since the request began
    pub elapsed_seconds: f64,
    /// Expected request duration in seconds (historical mean, or a default
    /// before any request has completed)
    pub expected_seconds: f64,
    /// True once elapsed time has reached the expected duration
    pub running_long: bool,
}

impl From<ProgressReport> for ProgressResponse {
    fn from(report: ProgressReport) -> Self {
        Self {
            fraction: report.fraction,
            elapsed_seconds: report.elapsed_seconds,
            expected_seconds: report.expected_seconds,
            running_long: report.running_long,
        }
    }
}

/// Liveness response for the root endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Always "ok" while the server is able to respond
    pub status: String,
}
