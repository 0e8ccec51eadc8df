use crate::AppState;
use crate::api::models::ProgressResponse;
use crate::errors::Error;
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

// GET /progress/{token} - Estimate progress of an in-flight request
#[utoipa::path(
    get,
    path = "/progress/{token}",
    tag = "research",
    summary = "Estimate request progress",
    description = "Estimates progress of an in-flight research request from its elapsed time and the \
                   historical mean duration. The fraction may exceed 1.0 for requests running longer \
                   than usual.",
    params(
        ("token" = Uuid, Path, description = "Token the request was submitted with"),
    ),
    responses(
        (status = 200, description = "Progress estimate", body = ProgressResponse),
        (status = 404, description = "Token unknown - never submitted, or already finished"),
    )
)]
#[tracing::instrument(skip_all, fields(token = %token))]
pub async fn get_progress(State(state): State<AppState>, Path(token): Path<Uuid>) -> Result<Json<ProgressResponse>, Error> {
    let report = state.progress.estimate(token).await?;
    Ok(Json(report.into()))
}
