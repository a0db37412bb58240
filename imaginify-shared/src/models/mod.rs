/// Database models
///
/// - `user`: accounts mirrored from the identity provider
/// - `image`: image records owned by users, with ownership checks
/// - `pagination`: offset pagination shared by list queries
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::models::image::{Image, ImageFilter};
/// use imaginify_shared::models::pagination::Pagination;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), imaginify_shared::error::DataError> {
/// let filter = ImageFilter::by_author(user_id);
/// let images = Image::list(&pool, &filter, Pagination::new(2, 9)).await?;
/// # Ok(())
/// # }
/// ```

pub mod image;
pub mod pagination;
pub mod user;
