/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `CLERK_WEBHOOK_SECRET`: Svix signing secret (`whsec_...`)
/// - `CLERK_SECRET_KEY`: Backend API key for metadata updates
/// - `CLERK_API_URL`: Backend API base (default: https://api.clerk.com)
/// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
/// - `RUN_MIGRATIONS`: Apply migrations at startup (default: false)
/// - `RUST_LOG`: Log filter
///
/// Secrets are optional here. A missing secret surfaces as a descriptive
/// error the first time something needs it, so the server can still boot
/// and answer health checks.
///
/// # Example
///
/// ```no_run
/// use imaginify_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use imaginify_shared::assets::CloudinaryConfig;
use imaginify_shared::db::pool::DatabaseConfig;
use imaginify_shared::identity::{ClerkConfig, DEFAULT_CLERK_API_URL};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// `None` when `DATABASE_URL` is unset
    pub database: Option<DatabaseConfig>,

    /// Identity provider settings
    pub clerk: ClerkSettings,

    /// CDN credentials
    pub cloudinary: CloudinaryConfig,

    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ClerkSettings {
    /// Svix signing secret for incoming webhooks
    pub webhook_secret: Option<String>,

    /// Backend API client settings
    pub api: ClerkConfig,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// Reads `.env` first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .map(|value| value.parse::<u16>())
            .transpose()
            .context("API_PORT must be a port number")?
            .unwrap_or(8080);

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .map(|value| value.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let database = var("DATABASE_URL").map(|url| {
            let mut database = DatabaseConfig::new(url);
            if let Some(max_connections) = max_connections {
                database.max_connections = max_connections;
            }
            database
        });

        let run_migrations = var("RUN_MIGRATIONS")
            .map(|value| value.parse::<bool>())
            .transpose()
            .context("RUN_MIGRATIONS must be true or false")?
            .unwrap_or(false);

        Ok(Self {
            api: ApiConfig { host, port },
            database,
            clerk: ClerkSettings {
                webhook_secret: var("CLERK_WEBHOOK_SECRET"),
                api: ClerkConfig {
                    api_url: var("CLERK_API_URL")
                        .unwrap_or_else(|| DEFAULT_CLERK_API_URL.to_string()),
                    secret_key: var("CLERK_SECRET_KEY"),
                },
            },
            cloudinary: CloudinaryConfig {
                cloud_name: var("CLOUDINARY_CLOUD_NAME"),
                api_key: var("CLOUDINARY_API_KEY"),
                api_secret: var("CLOUDINARY_API_SECRET"),
            },
            run_migrations,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
