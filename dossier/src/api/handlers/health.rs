use crate::api::models::StatusResponse;
use axum::Json;

// GET / - Liveness signal
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    summary = "Liveness check",
    responses(
        (status = 200, description = "Server is running", body = StatusResponse),
    )
)]
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}
