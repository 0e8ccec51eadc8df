//! # dossier: Company Research Service
//!
//! `dossier` exposes a small HTTP API that generates research reports on
//! companies via a generative-language model, and estimates progress of
//! in-flight report requests from historical request durations.
//!
//! ## Overview
//!
//! Report generation is a single slow outbound call - typically tens of
//! seconds - so clients want to show progress while they wait. The service
//! keeps a record of when each request started and a running mean of how long
//! completed requests have taken, both in shared PostgreSQL state, and
//! answers progress queries with `elapsed / expected` for any in-flight
//! token. Because all tracking state lives in the database, any number of
//! server instances can begin, finish, and report on each other's requests.
//!
//! ### Request Flow
//!
//! A client POSTs a company name together with a fresh token to `/research`.
//! The handler records the start timestamp under the token, forwards a
//! research prompt to the generative-language API, and streams nothing - it
//! simply waits for the full report. While it waits, the client can poll
//! `GET /progress/{token}`, which reads the start timestamp and the current
//! mean duration to produce a progress fraction. When the upstream call
//! finishes, the token's record is removed and - for successful requests -
//! its duration is folded into the running mean. Failed or cancelled
//! requests are removed without affecting the mean.
//!
//! ### Core Components
//!
//! The **tracking layer** ([`tracking`]) owns all shared state: the
//! token-to-start-timestamp records, the duration estimator behind a
//! swappable trait, and the progress computation. The **research layer**
//! ([`research`]) is the outbound client for the generative-language API.
//! The **API layer** ([`api`]) is a thin axum surface over both.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use dossier::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = dossier::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     dossier::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod research;
pub mod telemetry;
pub mod tracking;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::research::GenerativeClient;
use crate::tracking::{DurationEstimator, ProgressEstimator, RequestTracker, RunningMean};
use axum::http::HeaderValue;
use axum::{Router, routing::get, routing::post};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub tracker: RequestTracker,
    pub progress: ProgressEstimator,
    pub research: Arc<GenerativeClient>,
}

/// Get the dossier database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Wire up the tracking and research components over a database pool.
pub fn build_app_state(db: PgPool, config: Config) -> anyhow::Result<AppState> {
    let estimator: Arc<dyn DurationEstimator> = Arc::new(RunningMean::new(db.clone()));
    let tracker = RequestTracker::new(db, estimator.clone());
    let progress = ProgressEstimator::new(tracker.clone(), estimator);
    let research = Arc::new(GenerativeClient::new(&config.research)?);

    Ok(AppState::builder()
        .config(config)
        .tracker(tracker)
        .progress(progress)
        .research(research)
        .build())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    Ok(CorsLayer::new().allow_origin(origins))
}

/// Build the application router with all endpoints and middleware.
///
/// - Liveness endpoints (`/`, `/healthz`)
/// - Research and progress endpoints
/// - RapiDoc API documentation at `/docs`
/// - CORS and tracing middleware
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/", get(api::handlers::health::root))
        .route("/healthz", get(|| async { "OK" }))
        .route("/research", post(api::handlers::research::research_company))
        .route("/progress/{token}", get(api::handlers::progress::get_progress))
        .with_state(state)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to (or starts) the database,
///    runs migrations, and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
/// 3. **Shutdown**: connections are closed, telemetry is flushed, and an
///    embedded database (if any) is stopped
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    #[cfg(feature = "embedded-db")]
    embedded_db: Option<db::embedded::EmbeddedDatabase>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting research service with configuration: {:#?}", config);

        #[cfg(feature = "embedded-db")]
        let mut embedded_db: Option<db::embedded::EmbeddedDatabase> = None;

        let database_url = match &config.database {
            config::DatabaseConfig::Embedded { .. } => {
                #[cfg(feature = "embedded-db")]
                {
                    let persistent = config.database.embedded_persistent();
                    info!("Starting with embedded database (persistent: {})", persistent);
                    if !persistent {
                        info!("persistent=false: database will be ephemeral and data will be lost on shutdown");
                    }
                    let started = db::embedded::EmbeddedDatabase::start(config.database.embedded_data_dir(), persistent).await?;
                    let url = started.connection_string().to_string();
                    embedded_db = Some(started);
                    url
                }
                #[cfg(not(feature = "embedded-db"))]
                {
                    anyhow::bail!(
                        "Embedded database is configured but the feature is not enabled. \
                         Rebuild with --features embedded-db to use embedded database."
                    );
                }
            }
            config::DatabaseConfig::External { url } => {
                info!("Using external database");
                url.clone()
            }
        };

        let pool = PgPool::connect(&database_url).await?;
        migrator().run(&pool).await?;

        let state = build_app_state(pool.clone(), config.clone())?;
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            pool,
            #[cfg(feature = "embedded-db")]
            embedded_db,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Research service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        // Clean up embedded database if it exists
        #[cfg(feature = "embedded-db")]
        if let Some(embedded_db) = self.embedded_db {
            info!("Shutting down embedded database...");
            embedded_db.stop().await?;
        }

        Ok(())
    }
}
