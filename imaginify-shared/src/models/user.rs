/// User model and database operations
///
/// Users are never created directly by the application: they mirror accounts
/// held by the identity provider and are written by the webhook dispatcher.
/// The provider's id (`clerk_id`) is the external key; `id` is ours and is
/// pushed back to the provider as public metadata after creation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     clerk_id VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(320) NOT NULL,
///     username VARCHAR(255) NOT NULL DEFAULT '',
///     first_name VARCHAR(255) NOT NULL DEFAULT '',
///     last_name VARCHAR(255) NOT NULL DEFAULT '',
///     photo VARCHAR(2048) NOT NULL DEFAULT '',
///     credit_balance INTEGER NOT NULL DEFAULT 10 CHECK (credit_balance >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), imaginify_shared::error::DataError> {
/// let user = User::create(&pool, CreateUser {
///     clerk_id: "user_2abc".to_string(),
///     email: "jane@example.com".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let found = User::find_by_clerk_id(&pool, "user_2abc").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::pagination::{Page, Pagination};
use crate::error::{DataError, DataResult};

/// Credits granted to every new account
pub const STARTING_CREDITS: i32 = 10;

/// User account mirrored from the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Internal id
    pub id: Uuid,

    /// Identity provider id, unique and never changed after creation
    pub clerk_id: String,

    /// Primary email address ("" when the provider sent none)
    pub email: String,

    pub username: String,

    pub first_name: String,

    pub last_name: String,

    /// Profile picture URL
    pub photo: String,

    /// Remaining transformation credits, never negative
    pub credit_balance: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUser {
    pub clerk_id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    pub credit_balance: i32,
}

impl Default for CreateUser {
    fn default() -> Self {
        Self {
            clerk_id: String::new(),
            email: String::new(),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            photo: String::new(),
            credit_balance: STARTING_CREDITS,
        }
    }
}

/// Profile fields overwritten on `user.updated`
///
/// Every field is written; the provider always sends the full profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub photo: String,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// - `DataError::Conflict` if a user with the same `clerk_id` exists
    /// - `DataError::Database` on connection failures
    pub async fn create(pool: &PgPool, data: CreateUser) -> DataResult<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (clerk_id, email, username, first_name, last_name, photo, credit_balance)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, clerk_id, email, username, first_name, last_name, photo,
                      credit_balance, created_at, updated_at
            "#,
        )
        .bind(data.clerk_id)
        .bind(data.email)
        .bind(data.username)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.photo)
        .bind(data.credit_balance)
        .fetch_one(pool)
        .await?;

        debug!(user_id = %user.id, clerk_id = %user.clerk_id, "User created");
        Ok(user)
    }

    /// Finds a user by internal id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> DataResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, username, first_name, last_name, photo,
                   credit_balance, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by identity provider id
    pub async fn find_by_clerk_id(pool: &PgPool, clerk_id: &str) -> DataResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, username, first_name, last_name, photo,
                   credit_balance, created_at, updated_at
            FROM users
            WHERE clerk_id = $1
            "#,
        )
        .bind(clerk_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Overwrites the profile fields of the user with the given provider id
    ///
    /// # Errors
    ///
    /// `DataError::NotFound` if no such user exists.
    pub async fn update_by_clerk_id(
        pool: &PgPool,
        clerk_id: &str,
        data: UpdateUser,
    ) -> DataResult<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, username = $4, photo = $5, updated_at = NOW()
            WHERE clerk_id = $1
            RETURNING id, clerk_id, email, username, first_name, last_name, photo,
                      credit_balance, created_at, updated_at
            "#,
        )
        .bind(clerk_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.username)
        .bind(data.photo)
        .fetch_optional(pool)
        .await?;

        user.ok_or_else(|| DataError::NotFound("User".to_string()))
    }

    /// Deletes the user with the given provider id
    ///
    /// Images owned by the user are removed by the foreign key cascade.
    ///
    /// # Returns
    ///
    /// The deleted row, or `None` if there was nothing to delete. Replayed
    /// delete events therefore succeed without touching anything.
    pub async fn delete_by_clerk_id(pool: &PgPool, clerk_id: &str) -> DataResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE clerk_id = $1
            RETURNING id, clerk_id, email, username, first_name, last_name, photo,
                      credit_balance, created_at, updated_at
            "#,
        )
        .bind(clerk_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Adds `delta` credits (negative to spend) in a single statement
    ///
    /// # Errors
    ///
    /// - `DataError::NotFound` if the user does not exist
    /// - `DataError::InsufficientCredits` if the balance would go negative;
    ///   the balance is left unchanged
    pub async fn update_credits(pool: &PgPool, id: Uuid, delta: i32) -> DataResult<Self> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET credit_balance = credit_balance + $2, updated_at = NOW()
            WHERE id = $1 AND credit_balance + $2 >= 0
            RETURNING id, clerk_id, email, username, first_name, last_name, photo,
                      credit_balance, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(pool)
        .await?;

        if let Some(user) = updated {
            return Ok(user);
        }

        match Self::find_by_id(pool, id).await? {
            Some(user) => Err(DataError::InsufficientCredits {
                balance: user.credit_balance,
                requested: delta.saturating_neg(),
            }),
            None => Err(DataError::NotFound("User".to_string())),
        }
    }

    /// Lists users, newest first
    pub async fn list(pool: &PgPool, pagination: Pagination) -> DataResult<Page<Self>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, username, first_name, last_name, photo,
                   credit_balance, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

        let total = Self::count(pool).await?;

        Ok(Page {
            data: users,
            total_pages: pagination.total_pages(total),
        })
    }

    /// Total number of users
    pub async fn count(pool: &PgPool) -> DataResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
