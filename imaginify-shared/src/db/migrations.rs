/// Schema migrations
///
/// Migration files live in `imaginify-shared/migrations/` and are embedded at
/// compile time with `sqlx::migrate!`. Each migration has an up file
/// (`{timestamp}_{name}.up.sql`) and a rollback (`{timestamp}_{name}.down.sql`).
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::db::connector::Database;
/// use imaginify_shared::db::migrations::run_migrations;
/// use imaginify_shared::db::pool::DatabaseConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::new(Some(DatabaseConfig::new(std::env::var("DATABASE_URL")?)));
/// run_migrations(db.connect().await?).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Migrations recorded as successful
    pub applied_migrations: usize,

    /// Newest applied version
    pub latest_version: Option<i64>,

    /// Migrations embedded in this build
    pub known_migrations: usize,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.applied_migrations >= self.known_migrations
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(known = MIGRATOR.iter().count(), "Running database migrations");

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Reads `_sqlx_migrations` and compares it with the embedded set
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known_migrations = MIGRATOR.iter().filter(|m| m.migration_type.is_up_migration()).count();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            known_migrations,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    debug!(
        applied_migrations = count,
        latest_version = ?latest_version,
        "Migration status retrieved"
    );

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
        known_migrations,
    })
}
