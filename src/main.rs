use anyhow::Context;
use tracing_subscriber::EnvFilter;

use reschool_api::auth::TokenVerifier;
use reschool_api::database::DatabaseManager;
use reschool_api::notify::provider_from_config;
use reschool_api::state::AppState;
use reschool_api::{is_production, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = reschool_api::config::config().clone();
    tracing::info!("Starting ReSchool API in {:?} mode", config.environment);

    let verifier = TokenVerifier::from_config(&config.security)
        .context("no usable token key: set AUTH_JWT_PUBLIC_KEY or AUTH_JWT_SECRET")?;
    if is_production!() && config.security.jwt_public_key.is_none() {
        tracing::warn!("Verifying tokens with a shared secret in production");
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let notifier = provider_from_config(&config.notifications)?;
    tracing::info!("Notification provider: {}", notifier.name());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(pool.clone(), config, verifier, notifier);
    let app = server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("ReSchool API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close(pool).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
