/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use imaginify_api::{app::AppState, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(config);
/// let app = imaginify_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    routing::{get, post},
    Router,
};
use imaginify_shared::assets::{AssetSearch, CloudinaryClient};
use imaginify_shared::db::connector::Database;
use imaginify_shared::identity::ClerkClient;
use imaginify_shared::webhook::{PgAccountStore, WebhookDispatcher};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Lazily connected database handle
    pub db: Database,

    /// Application configuration
    pub config: Arc<Config>,

    /// Applies verified webhook events
    pub dispatcher: Arc<WebhookDispatcher>,

    /// CDN search used by the gallery
    pub assets: Arc<dyn AssetSearch>,
}

impl AppState {
    /// Creates application state backed by Postgres, the Clerk backend API
    /// and Cloudinary search
    ///
    /// No connection is opened here; the pool is created on first use.
    pub fn new(config: Config) -> Self {
        let db = Database::new(config.database.clone());
        let dispatcher = WebhookDispatcher::new(
            Arc::new(PgAccountStore::new(db.clone())),
            Arc::new(ClerkClient::new(config.clerk.api.clone())),
        );
        let assets = Arc::new(CloudinaryClient::new(config.cloudinary.clone()));

        Self::with_backends(db, config, dispatcher, assets)
    }

    /// Creates application state around existing backends
    pub fn with_backends(
        db: Database,
        config: Config,
        dispatcher: WebhookDispatcher,
        assets: Arc<dyn AssetSearch>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            assets,
        }
    }

    /// Svix signing secret, if configured
    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.clerk.webhook_secret.as_deref()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                # Health check
/// ├── GET  /api/images            # Public gallery with optional CDN search
/// └── POST /api/webhooks/clerk    # Identity provider webhook (Svix signed)
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let webhook_routes =
        Router::new().route("/clerk", post(routes::webhooks::clerk_webhook));

    Router::new()
        .merge(health_routes)
        .route("/api/images", get(routes::images::list_images))
        .nest("/api/webhooks", webhook_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
