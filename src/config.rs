//! Settings for TableFs
//!
//! Settings are read from a JSON document shaped like an editor settings
//! section. Connection parameters live under `connection`, presentation
//! parameters under `fs`:
//!
//! ```json
//! {
//!   "connection": { "backend": "mysql", "dbHost": "localhost", "dbUser": "app", "dbName": "shop" },
//!   "fs": { "table": "zzz_misccode", "extension": ".php" }
//! }
//! ```
//!
//! The password is never part of the settings document; it comes from a
//! [`SecretStore`](crate::secrets::SecretStore).

use crate::error::{FsError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TABLE: &str = "zzz_misccode";
pub const DEFAULT_EXTENSION: &str = ".php";
pub const DEFAULT_RESERVED_PREFIX: &str = "/.vscode";
pub const DEFAULT_DEBOUNCE_MS: u64 = 5;

/// Which SQL backend the connection speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl BackendKind {
    fn scheme(self) -> &'static str {
        match self {
            BackendKind::Mysql => "mysql",
            BackendKind::Postgres => "postgres",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

/// Connection parameters supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    pub backend: BackendKind,
    pub db_host: String,
    pub db_port: Option<u16>,
    pub db_user: String,
    /// Database name, or the database file path (or `:memory:`) for SQLite.
    pub db_name: String,
}

impl ConnectionSettings {
    /// SQLite settings for a file path or `":memory:"`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Sqlite,
            db_name: path.into(),
            ..Self::default()
        }
    }

    /// Build the driver URL for these settings.
    ///
    /// User and password are percent-encoded. SQLite ignores host, user and
    /// password.
    pub fn connection_url(&self, password: Option<&SecretString>) -> Result<String> {
        if self.backend == BackendKind::Sqlite {
            return Ok(if self.db_name == ":memory:" {
                "sqlite::memory:?cache=shared".to_string()
            } else {
                format!("sqlite:{}?mode=rwc", self.db_name)
            });
        }

        if self.db_host.is_empty() {
            return Err(FsError::Config("dbHost is not set".to_string()));
        }

        let mut url = Url::parse(&format!("{}://{}", self.backend.scheme(), self.db_host))?;
        url.set_port(self.db_port)
            .map_err(|_| FsError::Config("dbPort cannot be applied to this url".to_string()))?;
        if !self.db_user.is_empty() {
            url.set_username(&self.db_user)
                .map_err(|_| FsError::Config("dbUser cannot be applied to this url".to_string()))?;
        }
        if let Some(password) = password {
            url.set_password(Some(password.expose_secret()))
                .map_err(|_| FsError::Config("password cannot be applied to this url".to_string()))?;
        }
        url.set_path(&format!("/{}", self.db_name));

        Ok(url.into())
    }
}

/// How the table is presented as a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FsOptions {
    pub table: String,
    pub extension: String,
    pub reserved_prefix: String,
    pub debounce_ms: u64,
    /// Issue `CREATE TABLE IF NOT EXISTS` on first connect.
    pub create_table: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            create_table: false,
        }
    }
}

impl FsOptions {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.table.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(FsError::Config(format!(
                "table name {:?} is not a plain identifier",
                self.table
            )));
        }
        if self.extension.contains('/') {
            return Err(FsError::Config(format!(
                "extension {:?} must not contain '/'",
                self.extension
            )));
        }
        Ok(())
    }
}

/// Complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub fs: FsOptions,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.fs.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
