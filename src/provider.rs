//! Filesystem provider over the record table
//!
//! [`TableFs`] answers editor filesystem calls (stat, list, read, write,
//! rename, delete, watch) by querying the `(name, code)` table through a
//! [`RecordStore`]. Every successful mutation queues change events on the
//! [`ChangeNotifier`], which delivers them to observers in batches.

use crate::config::{ConnectionSettings, FsOptions, Settings};
use crate::connection::ConnectionManager;
use crate::error::{FsError, Result};
use crate::header;
use crate::namespace::Namespace;
use crate::notify::{ChangeNotifier, FileChangeEvent};
use crate::secrets::SecretStore;
use crate::store::{RecordStore, RenameOutcome, WriteOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// File metadata, timestamps in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub kind: FileType,
    pub ctime: i64,
    pub mtime: i64,
    pub size: u64,
}

impl FileStat {
    pub fn is_file(&self) -> bool {
        self.kind == FileType::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileType::Directory
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub create: bool,
    pub overwrite: bool,
}

impl WriteOptions {
    /// Create if missing, replace if present.
    pub fn upsert() -> Self {
        Self {
            create: true,
            overwrite: true,
        }
    }

    /// Create only; fail if the file exists.
    pub fn create_new() -> Self {
        Self {
            create: true,
            overwrite: false,
        }
    }

    /// Replace only; fail if the file is missing.
    pub fn update() -> Self {
        Self {
            create: false,
            overwrite: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameOptions {
    pub overwrite: bool,
}

/// Subscription returned by [`FileSystemProvider::watch`].
///
/// Changes are broadcast for the whole namespace regardless of what was
/// watched, so the handle carries nothing but its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watcher {
    pub id: Uuid,
    pub path: String,
}

/// Filesystem operations an editor host calls.
#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    async fn stat(&self, path: &str) -> Result<FileStat>;

    async fn read_directory(&self, path: &str) -> Result<Vec<(String, FileType)>>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    async fn write_file(&self, path: &str, content: &[u8], options: WriteOptions) -> Result<()>;

    async fn rename(&self, old_path: &str, new_path: &str, options: RenameOptions) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    async fn create_directory(&self, path: &str) -> Result<()>;

    fn watch(&self, path: &str) -> Result<Watcher>;
}

/// A SQL table presented as a flat directory.
///
/// Must be created inside a tokio runtime: construction spawns the change
/// notifier task.
pub struct TableFs {
    store: RecordStore,
    namespace: Namespace,
    notifier: ChangeNotifier,
    root: FileStat,
}

impl TableFs {
    /// Build the provider around an injected connection manager.
    ///
    /// Nothing is opened until the first operation that touches the table.
    pub fn new(connection: ConnectionManager, options: &FsOptions) -> Result<Self> {
        let store = RecordStore::new(connection, options)?;
        let now = chrono::Utc::now().timestamp_millis();

        Ok(Self {
            store,
            namespace: Namespace::from_options(options),
            notifier: ChangeNotifier::spawn(options.debounce()),
            root: FileStat {
                kind: FileType::Directory,
                ctime: now,
                mtime: now,
                size: 0,
            },
        })
    }

    /// Convenience constructor from a settings document and a secret store.
    pub fn from_settings(settings: &Settings, secrets: Arc<dyn SecretStore>) -> Result<Self> {
        let connection = ConnectionManager::new(settings.connection.clone(), secrets);
        Self::new(connection, &settings.fs)
    }

    /// Convenience constructor for a SQLite database file.
    pub fn sqlite(
        path: impl Into<String>,
        secrets: Arc<dyn SecretStore>,
        options: &FsOptions,
    ) -> Result<Self> {
        let connection = ConnectionManager::new(ConnectionSettings::sqlite(path), secrets);
        Self::new(connection, options)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Receive batches of change events.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<FileChangeEvent>> {
        self.notifier.subscribe()
    }

    /// Close the backing connection. Later operations fail.
    pub async fn close(&self) {
        self.store.close().await;
    }

    fn reject_reserved(&self, path: &str) -> Result<()> {
        if self.namespace.is_reserved(path) {
            tracing::debug!(path, "Reserved path rejected");
            return Err(FsError::NotFound(path.to_string()));
        }
        Ok(())
    }

    /// Reserved-prefix check and key derivation in one step.
    fn resolve(&self, path: &str) -> Result<String> {
        self.reject_reserved(path)?;
        self.namespace
            .key_for(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }
}

#[async_trait]
impl FileSystemProvider for TableFs {
    #[instrument(skip(self), fields(operation = "stat"))]
    async fn stat(&self, path: &str) -> Result<FileStat> {
        if self.namespace.is_root(path) {
            return Ok(self.root);
        }

        let key = self.resolve(path)?;
        if !self.store.exists(&key).await? {
            return Err(FsError::NotFound(path.to_string()));
        }

        // Size and timestamps are not tracked per record.
        Ok(FileStat {
            kind: FileType::File,
            ctime: 0,
            mtime: 0,
            size: 0,
        })
    }

    #[instrument(skip(self), fields(operation = "read_directory"))]
    async fn read_directory(&self, path: &str) -> Result<Vec<(String, FileType)>> {
        if !self.namespace.is_root(path) {
            return Err(FsError::NotFound(path.to_string()));
        }

        let names = self.store.names().await?;
        Ok(names
            .iter()
            .map(|name| (self.namespace.entry_name(name), FileType::File))
            .collect())
    }

    #[instrument(skip(self), fields(operation = "read_file"))]
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.resolve(path)?;
        match self.store.code(&key).await? {
            Some(code) => Ok(header::present(&code)),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    #[instrument(skip(self, content), fields(operation = "write_file", size = content.len()))]
    async fn write_file(&self, path: &str, content: &[u8], options: WriteOptions) -> Result<()> {
        let key = self.resolve(path)?;
        let code = header::strip(content);

        match self
            .store
            .write(&key, &code, options.create, options.overwrite)
            .await?
        {
            WriteOutcome::Created => {
                self.notifier.fire_soon(vec![FileChangeEvent::created(path)]);
                Ok(())
            }
            WriteOutcome::Updated => {
                self.notifier.fire_soon(vec![FileChangeEvent::changed(path)]);
                Ok(())
            }
            WriteOutcome::Missing => Err(FsError::NotFound(path.to_string())),
            WriteOutcome::Conflict => Err(FsError::FileExists(path.to_string())),
        }
    }

    /// A missing source is not-found whatever `overwrite` says; an occupied
    /// destination blocks only when `overwrite` is false.
    #[instrument(skip(self), fields(operation = "rename"))]
    async fn rename(&self, old_path: &str, new_path: &str, options: RenameOptions) -> Result<()> {
        let old_key = self.resolve(old_path)?;
        let new_key = self.resolve(new_path)?;

        match self.store.rename(&old_key, &new_key, options.overwrite).await? {
            RenameOutcome::Renamed => {
                self.notifier.fire_soon(vec![
                    FileChangeEvent::deleted(old_path),
                    FileChangeEvent::created(new_path),
                ]);
                Ok(())
            }
            RenameOutcome::SourceMissing => Err(FsError::NotFound(old_path.to_string())),
            RenameOutcome::DestinationExists => Err(FsError::FileExists(new_path.to_string())),
        }
    }

    #[instrument(skip(self), fields(operation = "delete"))]
    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.resolve(path)?;
        if !self.store.delete(&key).await? {
            return Err(FsError::NotFound(path.to_string()));
        }

        self.notifier.fire_soon(vec![
            FileChangeEvent::namespace_changed(),
            FileChangeEvent::deleted(path),
        ]);
        Ok(())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.reject_reserved(path)?;
        Err(FsError::NoPermissions(path.to_string()))
    }

    fn watch(&self, path: &str) -> Result<Watcher> {
        self.reject_reserved(path)?;
        Ok(Watcher {
            id: Uuid::new_v4(),
            path: path.to_string(),
        })
    }
}
