use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use reserva_agent::extractor::SlotExtractor;
use reserva_agent::runtime::TurnRuntime;
use reserva_core::audit::{AuditSink, TracingAuditSink};
use reserva_core::config::{AppConfig, ConfigError, LoadOptions};
use reserva_core::policy::OccupancyLookup;
use reserva_db::repositories::{
    CallSessionRepository, ReservationRepository, SqlCallSessionRepository,
    SqlReservationRepository,
};
use reserva_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<TurnRuntime>,
    pub sessions: Arc<dyn CallSessionRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let sessions: Arc<dyn CallSessionRepository> =
        Arc::new(SqlCallSessionRepository::new(db_pool.clone()));
    // One concrete store serves both roles: booked-table persistence and the
    // occupancy sums the capacity check reads.
    let reservation_store = Arc::new(SqlReservationRepository::new(db_pool.clone()));
    let reservations: Arc<dyn ReservationRepository> = reservation_store.clone();
    let occupancy: Arc<dyn OccupancyLookup> = reservation_store;

    let extractor = SlotExtractor::from_config(&config.analyzer);
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let runtime = Arc::new(TurnRuntime::new(
        config.clone(),
        extractor,
        sessions.clone(),
        reservations,
        occupancy,
        audit,
    ));
    info!(
        event_name = "system.bootstrap.runtime_ready",
        analyzer = ?config.analyzer.provider,
        language = ?config.restaurant.default_language,
        "turn runtime initialized"
    );

    Ok(Application { config, db_pool, runtime, sessions })
}

#[cfg(test)]
mod tests {
    use reserva_core::config::{AnalyzerProvider, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_gemini_has_no_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                analyzer_provider: Some(AnalyzerProvider::Gemini),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("analyzer.api_key"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_schema_and_first_turn() {
        let app = bootstrap(memory_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('call_session', 'reservation')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected foundation tables to be available after bootstrap");
        assert_eq!(table_count, 2, "bootstrap should expose both conversation-path tables");

        // One full turn through the real stack: fresh call, greeting reply,
        // session persisted for the next webhook.
        let reply = app
            .runtime
            .handle_turn("CAbootstrap0001", "hola, buenas tardes", Some("+34600111222"))
            .await;
        assert!(!reply.terminal);
        assert!(!reply.text.is_empty());

        let session = app
            .sessions
            .find_by_call_sid("CAbootstrap0001")
            .await
            .expect("session store should be reachable")
            .expect("the turn should have persisted a session");
        assert_eq!(session.call_sid, "CAbootstrap0001");

        app.db_pool.close().await;
    }
}
