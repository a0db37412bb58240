//! # Imaginify API Server
//!
//! Backend for the Imaginify image transformation app. Keeps the local user
//! table in sync with the identity provider through signed webhooks and
//! serves the public image gallery.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p imaginify-api
//! ```

use anyhow::Context;
use imaginify_api::app::{build_router, AppState};
use imaginify_api::config::Config;
use imaginify_shared::db::migrations::run_migrations;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imaginify_api=debug,imaginify_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        authors = imaginify_shared::AUTHORS,
        "Imaginify API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    if config.database.is_none() {
        tracing::warn!("DATABASE_URL is not set; webhook deliveries will fail until it is");
    }
    if config.clerk.webhook_secret.is_none() {
        tracing::warn!("CLERK_WEBHOOK_SECRET is not set; webhook deliveries will be rejected");
    }

    let bind_address = config.bind_address();
    let state = AppState::new(config);

    if state.config.run_migrations {
        let pool = state
            .db
            .connect()
            .await
            .context("Failed to connect to database for migrations")?;
        run_migrations(pool).await.context("Failed to run migrations")?;
    }

    let db = state.db.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
