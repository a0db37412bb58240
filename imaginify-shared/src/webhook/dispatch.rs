/// Applies verified identity provider events to the local account store
///
/// # Event Handling
///
/// ```text
/// user.created  ──> insert user (10 credits) ──> push {"userId"} metadata
/// user.updated  ──> overwrite profile fields by provider id
/// user.deleted  ──> delete by provider id (images cascade)
/// anything else ──> acknowledged, ignored
/// ```
///
/// Persistence goes through [`AccountStore`] and the metadata push through
/// [`IdentityProvider`], so the dispatcher can be exercised without Postgres
/// or network access.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::event::{DeletedPayload, UserPayload, WebhookEvent};
use crate::db::connector::Database;
use crate::error::DataError;
use crate::identity::{user_id_metadata, IdentityError, IdentityProvider};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Persistence operations the webhook needs
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, data: CreateUser) -> Result<User, DataError>;

    async fn update_user(&self, clerk_id: &str, data: UpdateUser) -> Result<User, DataError>;

    /// `None` when no user had that provider id
    async fn delete_user(&self, clerk_id: &str) -> Result<Option<User>, DataError>;
}

/// [`AccountStore`] backed by the lazily connected Postgres pool
#[derive(Clone)]
pub struct PgAccountStore {
    db: Database,
}

impl PgAccountStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, DataError> {
        let pool = self.db.connect().await?;
        User::create(pool, data).await
    }

    async fn update_user(&self, clerk_id: &str, data: UpdateUser) -> Result<User, DataError> {
        let pool = self.db.connect().await?;
        User::update_by_clerk_id(pool, clerk_id, data).await
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<Option<User>, DataError> {
        let pool = self.db.connect().await?;
        User::delete_by_clerk_id(pool, clerk_id).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// What a dispatched event did
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Created(User),
    Updated(User),
    Deleted(User),

    /// Delete for a provider id we hold no row for (replayed delivery)
    AlreadyDeleted { clerk_id: String },

    /// Delete event without a provider id
    MissingId,

    /// Event type with no handler
    Ignored { event_type: String },
}

pub struct WebhookDispatcher {
    accounts: Arc<dyn AccountStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl WebhookDispatcher {
    pub fn new(accounts: Arc<dyn AccountStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { accounts, identity }
    }

    pub async fn dispatch(&self, event: WebhookEvent) -> Result<DispatchOutcome, DispatchError> {
        match event {
            WebhookEvent::UserCreated(payload) => self.user_created(payload).await,
            WebhookEvent::UserUpdated(payload) => self.user_updated(payload).await,
            WebhookEvent::UserDeleted(payload) => self.user_deleted(payload).await,
            WebhookEvent::Unknown { event_type } => {
                info!(event_type = %event_type, "Ignoring unhandled webhook event");
                Ok(DispatchOutcome::Ignored { event_type })
            }
        }
    }

    async fn user_created(&self, payload: UserPayload) -> Result<DispatchOutcome, DispatchError> {
        let user = self.accounts.create_user(payload.to_create_user()).await?;
        info!(user_id = %user.id, clerk_id = %user.clerk_id, "User created from webhook");

        self.push_user_id(&user.clerk_id, user.id).await?;
        Ok(DispatchOutcome::Created(user))
    }

    async fn user_updated(&self, payload: UserPayload) -> Result<DispatchOutcome, DispatchError> {
        let user = self
            .accounts
            .update_user(&payload.id, payload.to_update_user())
            .await?;
        info!(user_id = %user.id, clerk_id = %user.clerk_id, "User updated from webhook");

        Ok(DispatchOutcome::Updated(user))
    }

    async fn user_deleted(
        &self,
        payload: DeletedPayload,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(clerk_id) = payload.id.filter(|id| !id.is_empty()) else {
            warn!("user.deleted event without an id");
            return Ok(DispatchOutcome::MissingId);
        };

        match self.accounts.delete_user(&clerk_id).await? {
            Some(user) => {
                info!(user_id = %user.id, clerk_id = %clerk_id, "User deleted from webhook");
                Ok(DispatchOutcome::Deleted(user))
            }
            None => {
                info!(clerk_id = %clerk_id, "User already deleted");
                Ok(DispatchOutcome::AlreadyDeleted { clerk_id })
            }
        }
    }

    async fn push_user_id(&self, clerk_id: &str, user_id: Uuid) -> Result<(), IdentityError> {
        self.identity
            .update_public_metadata(clerk_id, user_id_metadata(user_id))
            .await
            .map_err(|e| {
                warn!(clerk_id = %clerk_id, error = %e, "Failed to push user id to identity provider");
                e
            })
    }
}
