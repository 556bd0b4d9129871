//! Lazily established, single database connection
//!
//! The manager is owned by the adapter and opens exactly one connection, the
//! first time any operation needs it. Settings are captured at construction;
//! the password is fetched from the secret store at that first connect.
//!
//! There is no retry and no reconnect. If opening fails, the error goes to
//! the operation that triggered it and nothing is cached.

use crate::config::{BackendKind, ConnectionSettings};
use crate::error::{FsError, Result};
use crate::secrets::{PASSWORD_KEY, SecretStore};
use sqlx::any::install_default_drivers;
use sqlx::pool::PoolOptions;
use sqlx::AnyPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub struct ConnectionManager {
    settings: ConnectionSettings,
    secrets: Arc<dyn SecretStore>,
    bootstrap: Option<String>,
    pool: OnceCell<AnyPool>,
}

impl ConnectionManager {
    pub fn new(settings: ConnectionSettings, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            settings,
            secrets,
            bootstrap: None,
            pool: OnceCell::new(),
        }
    }

    /// Statement executed once, right after the connection is opened.
    pub fn with_bootstrap(mut self, statement: impl Into<String>) -> Self {
        self.bootstrap = Some(statement.into());
        self
    }

    pub fn backend(&self) -> BackendKind {
        self.settings.backend
    }

    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// Get the connection, opening it on first use.
    pub async fn connection(&self) -> Result<&AnyPool> {
        self.pool.get_or_try_init(|| self.open()).await
    }

    async fn open(&self) -> Result<AnyPool> {
        install_default_drivers();

        let password = self.secrets.get(PASSWORD_KEY).await?;
        let url = self.settings.connection_url(password.as_ref())?;

        // One connection, never recycled, so every statement goes through
        // the same handle in order.
        let pool: AnyPool = PoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect(&url)
            .await
            .map_err(FsError::Connection)?;

        tracing::info!(
            backend = ?self.settings.backend,
            host = %self.settings.db_host,
            database = %self.settings.db_name,
            "Connected to backing store"
        );

        if let Some(statement) = &self.bootstrap {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(pool)
    }

    /// Close the connection. Operations issued afterwards fail; the
    /// connection is not reopened.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::info!("Closed backing store connection");
        }
    }
}
