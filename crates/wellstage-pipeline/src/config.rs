//! Configuration management

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default staging schema.
pub const DEFAULT_DB_SCHEMA: &str = "public";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default directory holding the CSV exports.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default API page window.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default slice size for batch writes.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default retry limit per slice.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub load: LoadConfig,
    /// Directory of CSV exports for the file source
    pub data_dir: String,
    /// Accepted for compatibility with existing deployments; the orchestrator
    /// runs strictly sequentially and logs when this is set.
    pub parallel: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub schema: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Remote API source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub email: String,
    pub password: String,
    pub page_size: usize,
}

/// Batch writer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub batch_size: usize,
    pub max_retries: u32,
}

impl Settings {
    /// Load configuration from `.env` / environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Settings {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or_default(),
                schema: std::env::var("DB_SCHEMA")
                    .unwrap_or_else(|_| DEFAULT_DB_SCHEMA.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            api: ApiConfig {
                base_url: std::env::var("API_BASE_URL").unwrap_or_default(),
                api_key: std::env::var("API_KEY").unwrap_or_default(),
                email: std::env::var("API_EMAIL").unwrap_or_default(),
                password: std::env::var("API_PASSWORD").unwrap_or_default(),
                page_size: std::env::var("API_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PAGE_SIZE),
            },
            load: LoadConfig {
                batch_size: std::env::var("CHUNK_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_BATCH_SIZE),
                max_retries: std::env::var("LOAD_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_RETRIES),
            },
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
            parallel: std::env::var("USE_PARALLEL")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL must be set");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }
        if self.load.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }
        if self.api.page_size == 0 {
            anyhow::bail!("API page size must be greater than 0");
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Build the connection pool used for the whole run
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.url)
            .await?;
        Ok(pool)
    }
}

impl ApiConfig {
    /// Check that the API source is fully configured
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("API_BASE_URL must be set to use the API source");
        }
        if self.api_key.is_empty() || self.email.is_empty() || self.password.is_empty() {
            anyhow::bail!("API_KEY, API_EMAIL and API_PASSWORD must be set to use the API source");
        }
        Ok(())
    }
}
