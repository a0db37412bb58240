/// Image model and database operations
///
/// An image record points at an asset stored in the media CDN (`public_id`,
/// `secure_url`) and remembers how it was transformed. Every image belongs to
/// exactly one user; only that user may update or delete it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE images (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     transformation_type VARCHAR(255) NOT NULL,
///     public_id VARCHAR(512) NOT NULL,
///     secure_url VARCHAR(2048) NOT NULL,
///     width INTEGER,
///     height INTEGER,
///     config JSONB,
///     transformation_url VARCHAR(2048),
///     aspect_ratio VARCHAR(64),
///     color VARCHAR(64),
///     prompt TEXT,
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::models::image::{CreateImage, Image, UpdateImage};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), imaginify_shared::error::DataError> {
/// let image = Image::create(&pool, user_id, CreateImage {
///     title: "Beach".to_string(),
///     transformation_type: "restore".to_string(),
///     public_id: "imaginify/beach".to_string(),
///     secure_url: "https://res.cloudinary.com/demo/image/upload/beach.jpg".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let image_id: Uuid = image.id.parse().unwrap();
/// Image::update(&pool, image_id, user_id, UpdateImage {
///     title: Some("Beach, restored".to_string()),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use super::pagination::Pagination;
use super::user::User;
use crate::error::{DataError, DataResult};

/// Stored image row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,
    pub title: String,

    /// Transformation applied (restore, removeBackground, fill, ...)
    pub transformation_type: String,

    /// CDN asset id
    pub public_id: String,

    /// HTTPS delivery URL of the original asset
    pub secure_url: String,

    pub width: Option<i32>,
    pub height: Option<i32>,

    /// Transformation parameters as sent by the editor
    pub config: Option<JsonValue>,

    pub transformation_url: Option<String>,
    pub aspect_ratio: Option<String>,
    pub color: Option<String>,
    pub prompt: Option<String>,

    /// Owning user, immutable
    pub author_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateImage {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 255, message = "Transformation type is required"))]
    pub transformation_type: String,

    #[validate(length(min = 1, max = 512, message = "Public id is required"))]
    pub public_id: String,

    #[validate(url(message = "Secure URL must be a valid URL"))]
    pub secure_url: String,

    pub width: Option<i32>,
    pub height: Option<i32>,
    pub config: Option<JsonValue>,

    #[validate(url(message = "Transformation URL must be a valid URL"))]
    pub transformation_url: Option<String>,

    #[validate(length(max = 64))]
    pub aspect_ratio: Option<String>,

    #[validate(length(max = 64))]
    pub color: Option<String>,

    #[validate(length(max = 1000, message = "Prompt must be at most 1000 characters"))]
    pub prompt: Option<String>,
}

/// Input for updating an image
///
/// Only `Some` fields are written. The author can never be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateImage {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Transformation type cannot be empty"))]
    pub transformation_type: Option<String>,

    #[validate(length(min = 1, max = 512, message = "Public id cannot be empty"))]
    pub public_id: Option<String>,

    #[validate(url(message = "Secure URL must be a valid URL"))]
    pub secure_url: Option<String>,

    pub width: Option<i32>,
    pub height: Option<i32>,
    pub config: Option<JsonValue>,

    #[validate(url(message = "Transformation URL must be a valid URL"))]
    pub transformation_url: Option<String>,

    #[validate(length(max = 64))]
    pub aspect_ratio: Option<String>,

    #[validate(length(max = 64))]
    pub color: Option<String>,

    #[validate(length(max = 1000, message = "Prompt must be at most 1000 characters"))]
    pub prompt: Option<String>,
}

/// Author fields exposed alongside an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub clerk_id: String,
}

/// Image as returned to callers: ids flattened to strings, author populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageView {
    pub id: String,
    pub title: String,
    pub transformation_type: String,
    pub public_id: String,
    pub secure_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub config: Option<JsonValue>,
    pub transformation_url: Option<String>,
    pub aspect_ratio: Option<String>,
    pub color: Option<String>,
    pub prompt: Option<String>,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageView {
    pub fn new(image: Image, author: &User) -> Self {
        Self {
            id: image.id.to_string(),
            title: image.title,
            transformation_type: image.transformation_type,
            public_id: image.public_id,
            secure_url: image.secure_url,
            width: image.width,
            height: image.height,
            config: image.config,
            transformation_url: image.transformation_url,
            aspect_ratio: image.aspect_ratio,
            color: image.color,
            prompt: image.prompt,
            author: AuthorSummary {
                id: author.id.to_string(),
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
                clerk_id: author.clerk_id.clone(),
            },
            created_at: image.created_at,
            updated_at: image.updated_at,
        }
    }
}

/// Joined row used by populated reads
#[derive(Debug, sqlx::FromRow)]
struct ImageWithAuthorRow {
    id: Uuid,
    title: String,
    transformation_type: String,
    public_id: String,
    secure_url: String,
    width: Option<i32>,
    height: Option<i32>,
    config: Option<JsonValue>,
    transformation_url: Option<String>,
    aspect_ratio: Option<String>,
    color: Option<String>,
    prompt: Option<String>,
    author_id: Uuid,
    author_first_name: String,
    author_last_name: String,
    author_clerk_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ImageWithAuthorRow> for ImageView {
    fn from(row: ImageWithAuthorRow) -> Self {
        Self {
            id: row.id.to_string(),
            title: row.title,
            transformation_type: row.transformation_type,
            public_id: row.public_id,
            secure_url: row.secure_url,
            width: row.width,
            height: row.height,
            config: row.config,
            transformation_url: row.transformation_url,
            aspect_ratio: row.aspect_ratio,
            color: row.color,
            prompt: row.prompt,
            author: AuthorSummary {
                id: row.author_id.to_string(),
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                clerk_id: row.author_clerk_id,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Restricts list and count queries
///
/// Empty filter matches every image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFilter {
    /// Only images owned by this user
    pub author_id: Option<Uuid>,

    /// Only images whose CDN id is in this set
    pub public_ids: Option<Vec<String>>,
}

impl ImageFilter {
    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            public_ids: None,
        }
    }

    pub fn by_public_ids(public_ids: Vec<String>) -> Self {
        Self {
            author_id: None,
            public_ids: Some(public_ids),
        }
    }
}

impl Image {
    /// Fails with `Unauthorized` unless `requester_id` owns this image
    pub fn ensure_author(&self, requester_id: Uuid) -> DataResult<()> {
        if self.author_id == requester_id {
            Ok(())
        } else {
            warn!(
                image_id = %self.id,
                requester_id = %requester_id,
                "Rejected mutation of image owned by another user"
            );
            Err(DataError::Unauthorized(
                "image belongs to another user".to_string(),
            ))
        }
    }

    /// Creates an image owned by `author_id`
    ///
    /// # Errors
    ///
    /// - `DataError::Validation` if the input is invalid
    /// - `DataError::NotFound` if the author does not exist
    pub async fn create(pool: &PgPool, author_id: Uuid, data: CreateImage) -> DataResult<ImageView> {
        data.validate()?;

        let author = User::find_by_id(pool, author_id)
            .await?
            .ok_or_else(|| DataError::NotFound("User".to_string()))?;

        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (title, transformation_type, public_id, secure_url, width, height,
                                config, transformation_url, aspect_ratio, color, prompt, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, title, transformation_type, public_id, secure_url, width, height,
                      config, transformation_url, aspect_ratio, color, prompt, author_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.transformation_type)
        .bind(data.public_id)
        .bind(data.secure_url)
        .bind(data.width)
        .bind(data.height)
        .bind(data.config)
        .bind(data.transformation_url)
        .bind(data.aspect_ratio)
        .bind(data.color)
        .bind(data.prompt)
        .bind(author.id)
        .fetch_one(pool)
        .await?;

        debug!(image_id = %image.id, author_id = %author.id, "Image created");
        Ok(ImageView::new(image, &author))
    }

    /// Raw row by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> DataResult<Option<Self>> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, title, transformation_type, public_id, secure_url, width, height,
                   config, transformation_url, aspect_ratio, color, prompt, author_id,
                   created_at, updated_at
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(image)
    }

    /// Image with its author populated
    ///
    /// # Errors
    ///
    /// `DataError::NotFound` if no image has this id.
    pub async fn find_view_by_id(pool: &PgPool, id: Uuid) -> DataResult<ImageView> {
        let row = sqlx::query_as::<_, ImageWithAuthorRow>(
            r#"
            SELECT i.id, i.title, i.transformation_type, i.public_id, i.secure_url,
                   i.width, i.height, i.config, i.transformation_url, i.aspect_ratio,
                   i.color, i.prompt, i.author_id,
                   u.first_name AS author_first_name,
                   u.last_name AS author_last_name,
                   u.clerk_id AS author_clerk_id,
                   i.created_at, i.updated_at
            FROM images i
            JOIN users u ON u.id = i.author_id
            WHERE i.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(ImageView::from)
            .ok_or_else(|| DataError::NotFound("Image".to_string()))
    }

    /// Updates an image on behalf of `requester_id`
    ///
    /// # Errors
    ///
    /// - `DataError::Validation` if the input is invalid
    /// - `DataError::NotFound` if the image does not exist
    /// - `DataError::Unauthorized` if the requester is not the author; the
    ///   row is left untouched
    pub async fn update(
        pool: &PgPool,
        image_id: Uuid,
        requester_id: Uuid,
        data: UpdateImage,
    ) -> DataResult<ImageView> {
        data.validate()?;

        let existing = Self::find_by_id(pool, image_id)
            .await?
            .ok_or_else(|| DataError::NotFound("Image".to_string()))?;
        existing.ensure_author(requester_id)?;

        // author_id in the WHERE clause keeps the check and the write atomic
        let result = sqlx::query(
            r#"
            UPDATE images SET
                title = COALESCE($3, title),
                transformation_type = COALESCE($4, transformation_type),
                public_id = COALESCE($5, public_id),
                secure_url = COALESCE($6, secure_url),
                width = COALESCE($7, width),
                height = COALESCE($8, height),
                config = COALESCE($9, config),
                transformation_url = COALESCE($10, transformation_url),
                aspect_ratio = COALESCE($11, aspect_ratio),
                color = COALESCE($12, color),
                prompt = COALESCE($13, prompt),
                updated_at = NOW()
            WHERE id = $1 AND author_id = $2
            "#,
        )
        .bind(image_id)
        .bind(requester_id)
        .bind(data.title)
        .bind(data.transformation_type)
        .bind(data.public_id)
        .bind(data.secure_url)
        .bind(data.width)
        .bind(data.height)
        .bind(data.config)
        .bind(data.transformation_url)
        .bind(data.aspect_ratio)
        .bind(data.color)
        .bind(data.prompt)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound("Image".to_string()));
        }

        Self::find_view_by_id(pool, image_id).await
    }

    /// Deletes an image on behalf of `requester_id`
    ///
    /// # Errors
    ///
    /// - `DataError::NotFound` if the image does not exist
    /// - `DataError::Unauthorized` if the requester is not the author
    pub async fn delete(pool: &PgPool, image_id: Uuid, requester_id: Uuid) -> DataResult<()> {
        let existing = Self::find_by_id(pool, image_id)
            .await?
            .ok_or_else(|| DataError::NotFound("Image".to_string()))?;
        existing.ensure_author(requester_id)?;

        let result = sqlx::query("DELETE FROM images WHERE id = $1 AND author_id = $2")
            .bind(image_id)
            .bind(requester_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound("Image".to_string()));
        }

        debug!(image_id = %image_id, "Image deleted");
        Ok(())
    }

    /// Lists images matching `filter`, most recently updated first
    pub async fn list(
        pool: &PgPool,
        filter: &ImageFilter,
        pagination: Pagination,
    ) -> DataResult<Vec<ImageView>> {
        let rows = sqlx::query_as::<_, ImageWithAuthorRow>(
            r#"
            SELECT i.id, i.title, i.transformation_type, i.public_id, i.secure_url,
                   i.width, i.height, i.config, i.transformation_url, i.aspect_ratio,
                   i.color, i.prompt, i.author_id,
                   u.first_name AS author_first_name,
                   u.last_name AS author_last_name,
                   u.clerk_id AS author_clerk_id,
                   i.created_at, i.updated_at
            FROM images i
            JOIN users u ON u.id = i.author_id
            WHERE ($1::uuid IS NULL OR i.author_id = $1)
              AND ($2::text[] IS NULL OR i.public_id = ANY($2))
            ORDER BY i.updated_at DESC, i.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.author_id)
        .bind(filter.public_ids.as_deref())
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(ImageView::from).collect())
    }

    /// Counts images matching `filter`
    pub async fn count(pool: &PgPool, filter: &ImageFilter) -> DataResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM images i
            WHERE ($1::uuid IS NULL OR i.author_id = $1)
              AND ($2::text[] IS NULL OR i.public_id = ANY($2))
            "#,
        )
        .bind(filter.author_id)
        .bind(filter.public_ids.as_deref())
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_owned_by(author_id: Uuid) -> Image {
        Image {
            id: Uuid::new_v4(),
            title: "Portrait".to_string(),
            transformation_type: "restore".to_string(),
            public_id: "imaginify/portrait".to_string(),
            secure_url: "https://res.cloudinary.com/demo/image/upload/portrait.jpg".to_string(),
            width: Some(800),
            height: Some(600),
            config: None,
            transformation_url: None,
            aspect_ratio: None,
            color: None,
            prompt: None,
            author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn valid_create() -> CreateImage {
        CreateImage {
            title: "Portrait".to_string(),
            transformation_type: "restore".to_string(),
            public_id: "imaginify/portrait".to_string(),
            secure_url: "https://res.cloudinary.com/demo/image/upload/portrait.jpg".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_author() {
        let owner = Uuid::new_v4();
        let image = image_owned_by(owner);

        assert!(image.ensure_author(owner).is_ok());

        let snapshot = image.clone();
        let err = image.ensure_author(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DataError::Unauthorized(_)));
        assert_eq!(image, snapshot);
    }

    #[test]
    fn test_create_image_validation() {
        assert!(valid_create().validate().is_ok());

        let missing_title = CreateImage {
            title: String::new(),
            ..valid_create()
        };
        let err: DataError = missing_title.validate().unwrap_err().into();
        assert!(matches!(err, DataError::Validation(ref msg) if msg.contains("title")));

        let bad_url = CreateImage {
            secure_url: "not a url".to_string(),
            ..valid_create()
        };
        assert!(bad_url.validate().is_err());

        let long_prompt = CreateImage {
            prompt: Some("x".repeat(1001)),
            ..valid_create()
        };
        assert!(long_prompt.validate().is_err());
    }

    #[test]
    fn test_update_image_validation() {
        assert!(UpdateImage::default().validate().is_ok());

        let empty_title = UpdateImage {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_image_view_flattens_ids() {
        let author_id = Uuid::new_v4();
        let image = image_owned_by(author_id);
        let image_id = image.id;
        let author = User {
            id: author_id,
            clerk_id: "user_1".to_string(),
            email: "a@b.com".to_string(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            photo: String::new(),
            credit_balance: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = ImageView::new(image, &author);
        assert_eq!(view.id, image_id.to_string());
        assert_eq!(view.author.id, author_id.to_string());
        assert_eq!(view.author.first_name, "Ada");
        assert_eq!(view.author.clerk_id, "user_1");

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["id"].is_string());
        assert!(json["author"]["id"].is_string());
    }

    #[test]
    fn test_image_filter_constructors() {
        assert_eq!(ImageFilter::default().author_id, None);
        let id = Uuid::new_v4();
        assert_eq!(ImageFilter::by_author(id).author_id, Some(id));
        assert_eq!(
            ImageFilter::by_public_ids(vec!["a".to_string()]).public_ids,
            Some(vec!["a".to_string()])
        );
    }
}
