/// Common test utilities for integration tests
///
/// Builds the real router over in-memory account, identity and CDN search
/// backends, so the full request path runs without network access. Postgres
/// is only used by contexts built with [`TestContext::with_database`].

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use imaginify_api::app::{build_router, AppState};
use imaginify_api::config::Config;
use imaginify_shared::assets::{AssetError, AssetSearch};
use imaginify_shared::db::connector::Database;
use imaginify_shared::db::pool::DatabaseConfig;
use imaginify_shared::error::DataError;
use imaginify_shared::identity::{IdentityError, IdentityProvider};
use imaginify_shared::models::user::{CreateUser, UpdateUser, User};
use imaginify_shared::webhook::{AccountStore, WebhookDispatcher, WebhookVerifier};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

/// Account store that records every call
#[derive(Default)]
pub struct RecordingAccounts {
    pub users: Mutex<Vec<User>>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingAccounts {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn find(&self, clerk_id: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.clerk_id == clerk_id)
            .cloned()
    }
}

#[async_trait]
impl AccountStore for RecordingAccounts {
    async fn create_user(&self, data: CreateUser) -> Result<User, DataError> {
        self.calls.lock().unwrap().push(format!("create:{}", data.clerk_id));

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.clerk_id == data.clerk_id) {
            return Err(DataError::Conflict("users_clerk_id_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            clerk_id: data.clerk_id,
            email: data.email,
            username: data.username,
            first_name: data.first_name,
            last_name: data.last_name,
            photo: data.photo,
            credit_balance: data.credit_balance,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, clerk_id: &str, data: UpdateUser) -> Result<User, DataError> {
        self.calls.lock().unwrap().push(format!("update:{}", clerk_id));

        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.clerk_id == clerk_id)
            .ok_or_else(|| DataError::NotFound("User".to_string()))?;
        user.first_name = data.first_name;
        user.last_name = data.last_name;
        user.username = data.username;
        user.photo = data.photo;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<Option<User>, DataError> {
        self.calls.lock().unwrap().push(format!("delete:{}", clerk_id));

        let mut users = self.users.lock().unwrap();
        let position = users.iter().position(|u| u.clerk_id == clerk_id);
        Ok(position.map(|index| users.remove(index)))
    }
}

/// Identity provider that records metadata pushes
#[derive(Default)]
pub struct RecordingIdentity {
    pub pushed: Mutex<Vec<(String, JsonValue)>>,
}

#[async_trait]
impl IdentityProvider for RecordingIdentity {
    async fn update_public_metadata(
        &self,
        clerk_id: &str,
        metadata: JsonValue,
    ) -> Result<(), IdentityError> {
        self.pushed
            .lock()
            .unwrap()
            .push((clerk_id.to_string(), metadata));
        Ok(())
    }
}

/// CDN search that returns preset ids and records each expression
#[derive(Default)]
pub struct RecordingSearch {
    pub ids: Mutex<Vec<String>>,
    pub expressions: Mutex<Vec<String>>,
}

impl RecordingSearch {
    pub fn expressions(&self) -> Vec<String> {
        self.expressions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetSearch for RecordingSearch {
    async fn search_public_ids(&self, expression: &str) -> Result<Vec<String>, AssetError> {
        self.expressions
            .lock()
            .unwrap()
            .push(expression.to_string());
        Ok(self.ids.lock().unwrap().clone())
    }
}

/// Test context containing the router and its recording backends
pub struct TestContext {
    pub app: Router,
    pub db: Database,
    pub accounts: Arc<RecordingAccounts>,
    pub identity: Arc<RecordingIdentity>,
    pub assets: Arc<RecordingSearch>,
    verifier: WebhookVerifier,
}

impl TestContext {
    /// Router with the signing secret configured and no database
    pub fn new() -> Self {
        Self::with_secret(Some(TEST_SECRET))
    }

    pub fn with_secret(secret: Option<&str>) -> Self {
        Self::build(secret, Database::new(None))
    }

    /// Router backed by the database at `DATABASE_URL`, if set
    pub fn with_database() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(Self::build(
            Some(TEST_SECRET),
            Database::new(Some(DatabaseConfig::new(url))),
        ))
    }

    fn build(secret: Option<&str>, db: Database) -> Self {
        let config = Config::from_lookup(|name| match name {
            "CLERK_WEBHOOK_SECRET" => secret.map(str::to_string),
            _ => None,
        })
        .expect("Failed to build test config");

        let accounts = Arc::new(RecordingAccounts::default());
        let identity = Arc::new(RecordingIdentity::default());
        let assets = Arc::new(RecordingSearch::default());
        let dispatcher = WebhookDispatcher::new(accounts.clone(), identity.clone());

        let state = AppState::with_backends(db.clone(), config, dispatcher, assets.clone());

        Self {
            app: build_router(state),
            db,
            accounts,
            identity,
            assets,
            verifier: WebhookVerifier::new(TEST_SECRET).expect("Invalid test secret"),
        }
    }

    /// Plain GET request
    pub fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    /// Webhook request signed with the test secret
    pub fn signed_request(&self, msg_id: &str, body: &str) -> Request<Body> {
        let timestamp = Utc::now().timestamp();
        let signature = self.verifier.sign(msg_id, timestamp, body.as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/webhooks/clerk")
            .header("content-type", "application/json")
            .header("svix-id", msg_id)
            .header("svix-timestamp", timestamp.to_string())
            .header("svix-signature", signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Sends a request and returns the status and JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(JsonValue::Null)
        };

        (status, json)
    }
}
