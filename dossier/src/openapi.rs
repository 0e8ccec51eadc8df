//! OpenAPI documentation for the HTTP API, served via RapiDoc at `/docs`.

use crate::api::models::{ProgressResponse, ResearchRequest, ResearchResponse, StatusResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dossier",
        description = "Company research API: generates AI-written research reports and \
                       estimates progress of in-flight requests from historical durations."
    ),
    paths(
        crate::api::handlers::health::root,
        crate::api::handlers::research::research_company,
        crate::api::handlers::progress::get_progress,
    ),
    components(schemas(ResearchRequest, ResearchResponse, ProgressResponse, StatusResponse)),
    tags(
        (name = "research", description = "Report generation and progress estimation"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;
