/// Identity provider (Clerk) backend API client
///
/// After a `user.created` event is persisted, the internal user id is written
/// back to the provider as public metadata so the frontend can resolve the
/// signed-in account to a database row without another lookup.
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::identity::{user_id_metadata, ClerkClient, ClerkConfig, IdentityProvider};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), imaginify_shared::identity::IdentityError> {
/// let clerk = ClerkClient::new(ClerkConfig {
///     secret_key: Some("sk_test_xxx".to_string()),
///     ..Default::default()
/// });
///
/// clerk
///     .update_public_metadata("user_2abc", user_id_metadata(Uuid::new_v4()))
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("CLERK_SECRET_KEY is not configured")]
    MissingSecretKey,

    #[error("Identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Operations we perform against the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Merges `metadata` into the user's public metadata
    async fn update_public_metadata(
        &self,
        clerk_id: &str,
        metadata: JsonValue,
    ) -> Result<(), IdentityError>;
}

/// `{"userId": "<uuid>"}`
pub fn user_id_metadata(user_id: Uuid) -> JsonValue {
    json!({ "userId": user_id.to_string() })
}

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// Backend API base URL, without trailing slash
    pub api_url: String,

    /// Backend secret key. Requests fail with `MissingSecretKey` when unset.
    pub secret_key: Option<String>,
}

impl Default for ClerkConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CLERK_API_URL.to_string(),
            secret_key: None,
        }
    }
}

pub struct ClerkClient {
    client: Client,
    api_url: String,
    secret_key: Option<String>,
}

impl ClerkClient {
    pub fn new(config: ClerkConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.filter(|key| !key.is_empty()),
        }
    }

    fn metadata_url(&self, clerk_id: &str) -> String {
        format!("{}/v1/users/{}/metadata", self.api_url, clerk_id)
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn update_public_metadata(
        &self,
        clerk_id: &str,
        metadata: JsonValue,
    ) -> Result<(), IdentityError> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(IdentityError::MissingSecretKey)?;

        let response = self
            .client
            .patch(self.metadata_url(clerk_id))
            .bearer_auth(secret_key)
            .json(&json!({ "public_metadata": metadata }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(clerk_id = %clerk_id, status = status.as_u16(), "Metadata update rejected");
            return Err(IdentityError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(clerk_id = %clerk_id, "Public metadata updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_metadata_shape() {
        let id = Uuid::parse_str("6f1c2b9e-8d4a-4f3b-9c2e-1a2b3c4d5e6f").unwrap();
        assert_eq!(
            user_id_metadata(id),
            json!({ "userId": "6f1c2b9e-8d4a-4f3b-9c2e-1a2b3c4d5e6f" })
        );
    }

    #[test]
    fn test_metadata_url_trims_trailing_slash() {
        let client = ClerkClient::new(ClerkConfig {
            api_url: "https://clerk.example.com/".to_string(),
            secret_key: None,
        });
        assert_eq!(
            client.metadata_url("user_1"),
            "https://clerk.example.com/v1/users/user_1/metadata"
        );
    }

    #[tokio::test]
    async fn test_missing_secret_key_fails_before_request() {
        let client = ClerkClient::new(ClerkConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            secret_key: Some(String::new()),
        });

        let result = client
            .update_public_metadata("user_1", user_id_metadata(Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(IdentityError::MissingSecretKey)));
    }
}
