//! Embedded PostgreSQL support for development and demos.
//!
//! Starts a bundled PostgreSQL server inside the application process, so the
//! service can run without external infrastructure. Not intended for
//! multi-instance deployments - the whole point of the shared store is lost
//! when every instance has a private database.

use postgresql_embedded::{PostgreSQL, Settings};
use std::path::PathBuf;
use tracing::info;

const DATABASE_NAME: &str = "dossier";

/// A running embedded PostgreSQL server.
///
/// Dropping the value does not stop the server; call
/// [`stop`](EmbeddedDatabase::stop) during shutdown.
pub struct EmbeddedDatabase {
    postgresql: PostgreSQL,
    connection_string: String,
}

impl EmbeddedDatabase {
    /// Download (first run), initialize, and start an embedded server, then
    /// create the application database if it does not exist.
    ///
    /// With `persistent` set, data is kept under `data_dir` (default:
    /// `.dossier_data/postgres`) between restarts; otherwise the data
    /// directory is temporary and removed on stop.
    pub async fn start(data_dir: Option<&PathBuf>, persistent: bool) -> anyhow::Result<Self> {
        let mut settings = Settings::default();
        settings.temporary = !persistent;
        if persistent {
            settings.data_dir = data_dir
                .cloned()
                .unwrap_or_else(|| PathBuf::from(".dossier_data/postgres"));
        }

        let mut postgresql = PostgreSQL::new(settings);
        postgresql.setup().await?;
        postgresql.start().await?;

        if !postgresql.database_exists(DATABASE_NAME).await? {
            postgresql.create_database(DATABASE_NAME).await?;
        }

        let connection_string = postgresql.settings().url(DATABASE_NAME);
        info!("Embedded PostgreSQL started on port {}", postgresql.settings().port);

        Ok(Self {
            postgresql,
            connection_string,
        })
    }

    /// Connection string for the application database.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the embedded server.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.postgresql.stop().await?;
        Ok(())
    }
}
