//! Test helpers: build the real router over a test database pool, with the
//! upstream generative API pointed at a mock server.

use crate::config::{Config, DatabaseConfig, ResearchConfig};
use crate::{build_app_state, build_router};
use sqlx::PgPool;
use url::Url;

/// Install the rustls crypto provider exactly once for the test process.
///
/// Production does this in `main`; tests never run `main`, so the reqwest
/// client (built with the `rustls-no-provider` feature) would otherwise fail
/// to construct. Idempotent: a second install attempt is ignored.
pub fn install_crypto_provider() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// A config whose research client targets `api_base` (usually a wiremock
/// server). The database section is unused - tests inject a pool directly.
pub fn test_config(api_base: &str) -> Config {
    Config {
        database: DatabaseConfig::External {
            url: "postgresql://unused".to_string(),
        },
        research: ResearchConfig {
            api_base: Url::parse(api_base).expect("valid test API base"),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            ..ResearchConfig::default()
        },
        ..Config::default()
    }
}

/// Build a test server over the full application router.
pub async fn create_test_app(pool: PgPool, api_base: &str) -> axum_test::TestServer {
    install_crypto_provider();
    let state = build_app_state(pool, test_config(api_base)).expect("failed to build app state");
    let router = build_router(state).expect("failed to build router");
    axum_test::TestServer::new(router).expect("Failed to create test server")
}
