//! Database storage extension instance.
//!
//! Holds a sqlx connection pool for other components to persist state in.
//! The pool is opened on `start` and closed on `shutdown`.

use std::any::Any;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::component::{Component, ComponentError, ComponentId, CreateSettings};

use super::config::{DbDriver, DbStorageConfig};

/// Default maximum connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-memory SQLite datasource.
const SQLITE_MEMORY: &str = ":memory:";

/// Open connection pool of a started extension.
#[derive(Debug, Clone)]
pub enum DbPool {
    /// SQLite pool (`sqlite3` driver).
    Sqlite(SqlitePool),
    /// PostgreSQL pool (`pgx` driver).
    Postgres(PgPool),
}

impl DbPool {
    /// Close the pool gracefully.
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }

    /// Check if the pool is closed.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Sqlite(pool) => pool.is_closed(),
            Self::Postgres(pool) => pool.is_closed(),
        }
    }
}

/// Storage extension backed by a SQL database.
pub struct DbStorage {
    id: ComponentId,
    driver: DbDriver,
    datasource: String,
    span: tracing::Span,
    pool: RwLock<Option<DbPool>>,
}

impl std::fmt::Debug for DbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Datasources may embed credentials.
        f.debug_struct("DbStorage")
            .field("id", &self.id)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

impl DbStorage {
    /// Build the extension from a validated config.
    ///
    /// For SQLite files the parent directory must already exist.
    pub(crate) fn new(
        settings: CreateSettings,
        config: &DbStorageConfig,
    ) -> Result<Self, ComponentError> {
        let driver = config.driver.ok_or_else(|| {
            ComponentError::construction(&settings.id, "resolving driver", "missing driver name")
        })?;
        let datasource = config.datasource.trim().to_string();

        if driver == DbDriver::Sqlite3 {
            check_sqlite_directory(&settings.id, &datasource)?;
        }

        Ok(Self {
            id: settings.id,
            driver,
            datasource,
            span: settings.telemetry.span,
            pool: RwLock::new(None),
        })
    }

    /// Identity of this extension.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Configured driver.
    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    /// Live pool, if started.
    pub async fn pool(&self) -> Option<DbPool> {
        self.pool.read().await.clone()
    }

    /// Live pool, or `NotStarted`.
    pub async fn require_pool(&self) -> Result<DbPool, ComponentError> {
        self.pool().await.ok_or_else(|| ComponentError::NotStarted {
            id: self.id.to_string(),
        })
    }

    async fn connect(&self) -> Result<DbPool, ComponentError> {
        match self.driver {
            DbDriver::Sqlite3 => {
                let options = sqlite_options(&self.datasource)?
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(DEFAULT_MAX_CONNECTIONS)
                    .acquire_timeout(DEFAULT_CONNECT_TIMEOUT)
                    .connect_with(options)
                    .await?;
                Ok(DbPool::Sqlite(pool))
            }
            DbDriver::Pgx => {
                let pool = PgPoolOptions::new()
                    .max_connections(DEFAULT_MAX_CONNECTIONS)
                    .acquire_timeout(DEFAULT_CONNECT_TIMEOUT)
                    .connect(&self.datasource)
                    .await?;
                Ok(DbPool::Postgres(pool))
            }
        }
    }
}

fn sqlite_options(datasource: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    if datasource == SQLITE_MEMORY {
        SqliteConnectOptions::from_str("sqlite::memory:")
    } else if datasource.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(datasource)
    } else {
        Ok(SqliteConnectOptions::new().filename(datasource))
    }
}

/// Check that a SQLite datasource path can be created.
fn check_sqlite_directory(id: &ComponentId, datasource: &str) -> Result<(), ComponentError> {
    if datasource == SQLITE_MEMORY || datasource.starts_with("sqlite:") {
        return Ok(());
    }

    let Some(parent) = Path::new(datasource).parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }

    Err(ComponentError::construction(
        id,
        format!("opening datasource directory '{}'", parent.display()),
        std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
    ))
}

#[async_trait::async_trait]
impl Component for DbStorage {
    async fn start(&self) -> Result<(), ComponentError> {
        let mut slot = self.pool.write().await;
        if slot.is_some() {
            tracing::debug!(parent: &self.span, "Storage already started");
            return Ok(());
        }

        let pool = self.connect().instrument(self.span.clone()).await?;
        *slot = Some(pool);
        tracing::info!(parent: &self.span, driver = %self.driver, "Storage started");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ComponentError> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(parent: &self.span, "Storage shutdown complete");
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
