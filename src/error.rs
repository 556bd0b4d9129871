//! Error types for TableFs

use thiserror::Error;

/// Result type for TableFs operations
pub type Result<T> = std::result::Result<T, FsError>;

/// Filesystem-shaped error taxonomy.
///
/// The first three variants mirror the errors an editor expects from a
/// filesystem provider. Everything else is a failure of the backing store or
/// of the host-supplied settings and is passed through untouched.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("No permissions: {0}")]
    NoPermissions(String),

    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }

    pub fn is_file_exists(&self) -> bool {
        matches!(self, FsError::FileExists(_))
    }

    pub fn is_no_permissions(&self) -> bool {
        matches!(self, FsError::NoPermissions(_))
    }
}

impl From<url::ParseError> for FsError {
    fn from(err: url::ParseError) -> Self {
        FsError::Config(format!("invalid connection url: {}", err))
    }
}
