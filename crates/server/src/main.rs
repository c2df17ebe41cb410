mod bootstrap;
mod health;
mod voice;

use std::time::Duration;

use anyhow::Result;
use reserva_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use reserva_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "reserva-server accepting voice webhooks"
    );

    let router = voice::router(voice::VoiceState {
        runtime: app.runtime.clone(),
        sessions: app.sessions.clone(),
        default_language: app.config.restaurant.default_language,
    });
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(grace)).await?;

    tracing::info!(event_name = "system.server.stopping", "reserva-server stopping");
    Ok(())
}

async fn wait_for_shutdown(grace: Duration) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::info!(
        event_name = "system.server.draining",
        grace_secs = grace.as_secs(),
        "shutdown signal received, draining in-flight turns"
    );
    // In-flight turns that outlive the drain window are abandoned; Twilio
    // retries the webhook anyway.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(event_name = "system.server.drain_timeout", "drain window elapsed");
        std::process::exit(0);
    });
}
