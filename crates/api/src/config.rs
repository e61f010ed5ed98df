//! Application configuration loaded from environment variables.

use std::time::Duration;

use store::StoreConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `ALLOW_IN_MEMORY_STORE`: `true` lets the server start without
///   `DATABASE_URL` on the in-memory store, for local development only
///   (default: `false`)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `DATABASE_ACQUIRE_TIMEOUT_SECS`: pool checkout timeout (default: `5`)
/// - `DATABASE_STATEMENT_TIMEOUT_MS`: per-statement timeout inside
///   transactions (default: none)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database: Option<DatabaseConfig>,
    pub allow_in_memory: bool,
}

/// Which store the server runs on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackend<'a> {
    Postgres(&'a DatabaseConfig),
    /// Every transaction copies all tables and holds one global lock.
    InMemory,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Option<Duration>,
}

impl DatabaseConfig {
    /// Pool settings for [`store::PostgresStore::connect`].
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
            statement_timeout: self.statement_timeout,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let database = var("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                let pool = StoreConfig::default();
                DatabaseConfig {
                    url,
                    max_connections: var("DATABASE_MAX_CONNECTIONS")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(pool.max_connections),
                    acquire_timeout: var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                        .and_then(|v| v.parse().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(pool.acquire_timeout),
                    statement_timeout: var("DATABASE_STATEMENT_TIMEOUT_MS")
                        .and_then(|v| v.parse().ok())
                        .map(Duration::from_millis),
                }
            });

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            database,
            allow_in_memory: var("ALLOW_IN_MEMORY_STORE")
                .is_some_and(|v| matches!(v.trim(), "1" | "true")),
        }
    }

    /// Picks the store backend. Without a database URL the in-memory store
    /// must be requested explicitly.
    pub fn store_backend(&self) -> Result<StoreBackend<'_>, &'static str> {
        match (&self.database, self.allow_in_memory) {
            (Some(database), _) => Ok(StoreBackend::Postgres(database)),
            (None, true) => Ok(StoreBackend::InMemory),
            (None, false) => {
                Err("DATABASE_URL is not set; set ALLOW_IN_MEMORY_STORE=true for development")
            }
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database: None,
            allow_in_memory: false,
        }
    }
}
