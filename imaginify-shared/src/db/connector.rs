/// Lazily established, process-wide database handle
///
/// The first call to [`Database::connect`] creates the pool; every later call
/// gets the cached one. Callers that arrive while the first attempt is still
/// in flight wait on that attempt instead of starting their own, so a burst of
/// cold requests opens exactly one pool. A failed attempt is not cached and
/// the next caller tries again.
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::db::connector::Database;
/// use imaginify_shared::db::pool::DatabaseConfig;
///
/// # async fn example() -> Result<(), imaginify_shared::error::DataError> {
/// let db = Database::new(Some(DatabaseConfig::new("postgresql://localhost/imaginify")));
///
/// let pool = db.connect().await?;
/// sqlx::query("SELECT 1").execute(pool).await?;
/// # Ok(())
/// # }
/// ```

use std::future::Future;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::pool::{create_pool, DatabaseConfig};
use crate::error::{DataError, DataResult};

/// Single-flight lazy cell
///
/// Generic over the handle so the memoization can be exercised without a
/// database.
#[derive(Debug)]
pub struct LazyHandle<T> {
    cell: OnceCell<T>,
}

impl<T> LazyHandle<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns the cached value, running `init` if nothing is cached yet
    ///
    /// Only one `init` future runs at a time; concurrent callers wait for it.
    pub async fn get_or_connect<E, F, Fut>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }

    /// Cached value, if a connection has already been made
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Default for LazyHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Inner {
    config: Option<DatabaseConfig>,
    pool: LazyHandle<PgPool>,
}

/// Shared database handle
///
/// Cloning is cheap; all clones share the same lazily created pool.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Creates a handle; `None` means no connection string was configured
    pub fn new(config: Option<DatabaseConfig>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                pool: LazyHandle::new(),
            }),
        }
    }

    /// Whether a connection string is available
    pub fn is_configured(&self) -> bool {
        self.inner.config.is_some()
    }

    /// Pool if it has already been established, without connecting
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.get()
    }

    /// Returns the pool, connecting on first use
    ///
    /// # Errors
    ///
    /// - `DataError::Config` if no connection string is configured
    /// - `DataError::Database` if connecting fails
    pub async fn connect(&self) -> DataResult<&PgPool> {
        self.inner
            .pool
            .get_or_connect(|| async {
                let config = self.inner.config.as_ref().ok_or_else(|| {
                    DataError::Config(
                        "DATABASE_URL is not set; configure it in the deployment environment"
                            .to_string(),
                    )
                })?;

                create_pool(config).await.map_err(|e| {
                    error!(error = %e, "Failed to connect to database");
                    DataError::Database(e)
                })
            })
            .await
    }

    /// Closes the pool if one was opened
    pub async fn close(&self) {
        if let Some(pool) = self.inner.pool.get() {
            super::pool::close_pool(pool).await;
        } else {
            info!("Database was never connected, nothing to close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_without_url_is_config_error() {
        let db = Database::new(None);
        assert!(!db.is_configured());

        let err = db.connect().await.unwrap_err();
        assert!(matches!(err, DataError::Config(ref msg) if msg.contains("DATABASE_URL")));
        assert!(db.pool().is_none());
    }

    #[tokio::test]
    async fn test_lazy_handle_initializes_once() {
        let handle: LazyHandle<u32> = LazyHandle::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = handle
                .get_or_connect(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, DataError>(7)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_in_flight_attempt() {
        let handle: Arc<LazyHandle<u32>> = Arc::new(LazyHandle::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..16).map(|_| {
            let handle = handle.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                *handle
                    .get_or_connect(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, DataError>(42)
                    })
                    .await
                    .unwrap()
            })
        });

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_attempt_is_not_cached() {
        let handle: LazyHandle<u32> = LazyHandle::new();

        let first = handle
            .get_or_connect(|| async { Err(DataError::Config("missing".to_string())) })
            .await;
        assert!(first.is_err());
        assert!(handle.get().is_none());

        let second = handle
            .get_or_connect(|| async { Ok::<_, DataError>(1) })
            .await
            .unwrap();
        assert_eq!(*second, 1);
    }
}
