use crate::AppState;
use crate::api::models::{ResearchRequest, ResearchResponse};
use crate::errors::Error;
use axum::{Json, extract::State};

// POST /research - Generate a research report for a company
//
// Tracking brackets the upstream call: `begin` before, and exactly one of
// `complete` (success, duration folded into the mean) or `abandon` (failure,
// duration discarded) after. If the handler future is cancelled mid-call,
// the guard's drop releases the token in the background.
#[utoipa::path(
    post,
    path = "/research",
    tag = "research",
    summary = "Research a company",
    description = "Generates a research report on the named company via the generative-language API. \
                   The caller-supplied token can be used to query progress while the request runs.",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Generated report", body = ResearchResponse),
        (status = 400, description = "Blank company name"),
        (status = 502, description = "Report generation failed upstream"),
    )
)]
#[tracing::instrument(skip_all, fields(token = %payload.token))]
pub async fn research_company(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, Error> {
    let company_name = payload.company_name.trim().to_string();
    if company_name.is_empty() {
        return Err(Error::BadRequest {
            message: "company_name must not be blank".to_string(),
        });
    }

    let guard = state.tracker.begin(payload.token).await?;

    match state.research.generate_report(&company_name).await {
        Ok(report) => {
            // A release failure leaks the token record but the report is
            // already in hand; log it rather than failing the request.
            if let Err(e) = guard.complete().await {
                tracing::warn!("failed to finish tracking for {}: {e}", payload.token);
            }
            Ok(Json(ResearchResponse { report }))
        }
        Err(err) => {
            if let Err(e) = guard.abandon().await {
                tracing::warn!("failed to release tracking for {}: {e}", payload.token);
            }
            Err(err)
        }
    }
}
