//! # TableFs - A SQL Table as a Virtual Directory
//!
//! TableFs presents the rows of a single `(name, code)` table as files in a
//! flat directory, so an editor can open, edit, rename and delete them with
//! ordinary filesystem calls while every change lands in the database.
//!
//! ## Layout
//!
//! - `/` is the only directory.
//! - Each row `name` appears as `/<name><extension>` (`.php` by default).
//! - Paths under the reserved prefix (`/.vscode` by default) never resolve.
//! - File content is the stored code with a `<?` header line in front; the
//!   header is stripped again on write.
//!
//! ## Backends
//!
//! MySQL, PostgreSQL and SQLite via SQLx, selected by cargo feature and by
//! `ConnectionSettings::backend`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablefs::{FileSystemProvider, MemorySecretStore, Settings, TableFs, WriteOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_file("tablefs.json")?;
//!     let secrets = Arc::new(MemorySecretStore::with_password("secret"));
//!     let fs = TableFs::from_settings(&settings, secrets)?;
//!
//!     let mut changes = fs.subscribe();
//!     fs.write_file("/hello.php", b"<?\necho 'hi';", WriteOptions::create_new()).await?;
//!     println!("{:?}", changes.recv().await?);
//!
//!     for (name, _) in fs.read_directory("/").await? {
//!         println!("{name}");
//!     }
//!     fs.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod header;
pub mod namespace;
pub mod notify;
pub mod provider;
pub mod secrets;
pub mod store;

pub use config::{BackendKind, ConnectionSettings, FsOptions, Settings};
pub use connection::ConnectionManager;
pub use error::{FsError, Result};
pub use namespace::Namespace;
pub use notify::{ChangeNotifier, FileChangeEvent, FileChangeType};
pub use provider::{
    FileStat, FileSystemProvider, FileType, RenameOptions, TableFs, Watcher, WriteOptions,
};
pub use secrets::{MemorySecretStore, PASSWORD_KEY, SecretStore};
pub use store::{RecordStore, RenameOutcome, WriteOutcome};
