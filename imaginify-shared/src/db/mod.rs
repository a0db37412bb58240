/// Database layer
///
/// - `connector`: lazily created, single-flight process-wide pool handle
/// - `pool`: pool construction, health check, credential redaction
/// - `migrations`: embedded schema migrations
///
/// Record types and their queries live in [`crate::models`].
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::db::{connector::Database, pool::DatabaseConfig};
///
/// # async fn example() -> Result<(), imaginify_shared::error::DataError> {
/// let db = Database::new(std::env::var("DATABASE_URL").ok().map(DatabaseConfig::new));
/// let pool = db.connect().await?;
/// # Ok(())
/// # }
/// ```

pub mod connector;
pub mod migrations;
pub mod pool;
