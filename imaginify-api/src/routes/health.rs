/// `GET /health`
///
/// Always answers 200. The body says whether the database is usable:
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected" }
/// ```
///
/// The pool is opened lazily, so on a fresh process this request may be the
/// one that connects. A failed connect is not remembered and the next check
/// tries again. Without `DATABASE_URL` the database is reported as
/// `unconfigured` and no connection is attempted.

use crate::app::AppState;
use axum::{extract::State, Json};
use imaginify_shared::db::connector::Database;
use imaginify_shared::db::pool::health_check as ping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when the database answers, `degraded` otherwise
    pub status: String,

    pub version: String,

    /// `connected`, `disconnected` or `unconfigured`
    pub database: String,
}

async fn database_status(db: &Database) -> &'static str {
    if !db.is_configured() {
        return "unconfigured";
    }

    match db.connect().await {
        Ok(pool) if ping(pool).await.is_ok() => "connected",
        _ => "disconnected",
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = database_status(&state.db).await;
    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}
