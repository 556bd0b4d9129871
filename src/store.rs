//! Record storage over a single `(name, code)` table
//!
//! All values are bound parameters. Only the table name is interpolated,
//! and [`FsOptions::validate`] has already restricted it to a plain
//! identifier. Placeholder syntax differs per backend, so statements are
//! rendered once, at construction.

use crate::config::{BackendKind, FsOptions};
use crate::connection::ConnectionManager;
use crate::error::Result;
use sqlx::{any::AnyRow, AnyPool, Row};

/// Result of a create/overwrite write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// No row and creation was not allowed.
    Missing,
    /// Row exists (or appeared concurrently) and overwrite was not allowed.
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    SourceMissing,
    DestinationExists,
}

struct Statements {
    exists: String,
    select_code: String,
    select_names: String,
    insert: String,
    update_code: String,
    update_name: String,
    delete: String,
}

impl Statements {
    fn render(backend: BackendKind, table: &str) -> Self {
        let p = |n: usize| match backend {
            BackendKind::Postgres => format!("${}", n),
            BackendKind::Mysql | BackendKind::Sqlite => "?".to_string(),
        };

        Self {
            exists: format!("SELECT name FROM {table} WHERE name = {}", p(1)),
            select_code: format!("SELECT code FROM {table} WHERE name = {}", p(1)),
            select_names: format!("SELECT name FROM {table}"),
            insert: format!("INSERT INTO {table} (name, code) VALUES ({}, {})", p(1), p(2)),
            update_code: format!("UPDATE {table} SET code = {} WHERE name = {}", p(1), p(2)),
            update_name: format!("UPDATE {table} SET name = {} WHERE name = {}", p(1), p(2)),
            delete: format!("DELETE FROM {table} WHERE name = {}", p(1)),
        }
    }
}

fn create_table_statement(backend: BackendKind, table: &str) -> String {
    let (key_type, text_type) = match backend {
        BackendKind::Mysql => ("VARCHAR(255)", "MEDIUMTEXT"),
        BackendKind::Postgres => ("VARCHAR(255)", "TEXT"),
        BackendKind::Sqlite => ("TEXT", "TEXT"),
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (name {key_type} NOT NULL PRIMARY KEY, code {text_type} NOT NULL)"
    )
}

/// Read a text column, accepting drivers that report text as bytes.
fn text_column(row: &AnyRow, idx: usize) -> Result<String> {
    match row.try_get::<String, _>(idx) {
        Ok(text) => Ok(text),
        Err(err) => match row.try_get::<Vec<u8>, _>(idx) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => Err(err.into()),
        },
    }
}

/// Table access for the namespace adapter.
///
/// Owns the connection manager, so closing the store closes the connection.
pub struct RecordStore {
    connection: ConnectionManager,
    statements: Statements,
}

impl RecordStore {
    pub fn new(connection: ConnectionManager, options: &FsOptions) -> Result<Self> {
        options.validate()?;

        let backend = connection.backend();
        let connection = if options.create_table {
            connection.with_bootstrap(create_table_statement(backend, &options.table))
        } else {
            connection
        };

        Ok(Self {
            connection,
            statements: Statements::render(backend, &options.table),
        })
    }

    async fn pool(&self) -> Result<&AnyPool> {
        self.connection.connection().await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let row: Option<AnyRow> = sqlx::query(&self.statements.exists)
            .bind(key)
            .fetch_optional(self.pool().await?)
            .await?;
        Ok(row.is_some())
    }

    pub async fn code(&self, key: &str) -> Result<Option<String>> {
        let row: Option<AnyRow> = sqlx::query(&self.statements.select_code)
            .bind(key)
            .fetch_optional(self.pool().await?)
            .await?;
        row.map(|row| text_column(&row, 0)).transpose()
    }

    /// Every key in the table, in whatever order the backend returns them.
    pub async fn names(&self) -> Result<Vec<String>> {
        let rows: Vec<AnyRow> = sqlx::query(&self.statements.select_names)
            .fetch_all(self.pool().await?)
            .await?;
        rows.iter().map(|row| text_column(row, 0)).collect()
    }

    /// Insert or update `key` according to the create/overwrite flags.
    ///
    /// The existence check and the write share one transaction; the primary
    /// key catches a concurrent insert that slips past the check.
    pub async fn write(
        &self,
        key: &str,
        code: &str,
        create: bool,
        overwrite: bool,
    ) -> Result<WriteOutcome> {
        let mut tx = self.pool().await?.begin().await?;

        let exists = sqlx::query(&self.statements.exists)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        let outcome = if !exists {
            if !create {
                WriteOutcome::Missing
            } else {
                let inserted = sqlx::query(&self.statements.insert)
                    .bind(key)
                    .bind(code)
                    .execute(&mut *tx)
                    .await;
                match inserted {
                    Ok(_) => WriteOutcome::Created,
                    Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                        WriteOutcome::Conflict
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        } else if create && !overwrite {
            WriteOutcome::Conflict
        } else {
            sqlx::query(&self.statements.update_code)
                .bind(code)
                .bind(key)
                .execute(&mut *tx)
                .await?;
            WriteOutcome::Updated
        };

        match outcome {
            WriteOutcome::Created | WriteOutcome::Updated => tx.commit().await?,
            WriteOutcome::Missing | WriteOutcome::Conflict => tx.rollback().await?,
        }
        Ok(outcome)
    }

    /// Move the row under `old` to `new`.
    ///
    /// With `overwrite`, an existing row under `new` is replaced. Renaming a
    /// key onto itself leaves the table untouched.
    pub async fn rename(&self, old: &str, new: &str, overwrite: bool) -> Result<RenameOutcome> {
        let mut tx = self.pool().await?.begin().await?;

        let source = sqlx::query(&self.statements.exists)
            .bind(old)
            .fetch_optional(&mut *tx)
            .await?;
        if source.is_none() {
            tx.rollback().await?;
            return Ok(RenameOutcome::SourceMissing);
        }
        if old == new {
            tx.rollback().await?;
            return Ok(RenameOutcome::Renamed);
        }

        let destination = sqlx::query(&self.statements.exists)
            .bind(new)
            .fetch_optional(&mut *tx)
            .await?;
        if destination.is_some() {
            if !overwrite {
                tx.rollback().await?;
                return Ok(RenameOutcome::DestinationExists);
            }
            sqlx::query(&self.statements.delete)
                .bind(new)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(&self.statements.update_name)
            .bind(new)
            .bind(old)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(RenameOutcome::Renamed)
    }

    /// Delete `key`. Returns `false` when there was no such row.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(&self.statements.delete)
            .bind(key)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use crate::secrets::MemorySecretStore;
    use std::sync::Arc;

    fn sqlite_store(dir: &tempfile::TempDir) -> RecordStore {
        let path = dir.path().join("store.db");
        let manager = ConnectionManager::new(
            ConnectionSettings::sqlite(path.to_string_lossy()),
            Arc::new(MemorySecretStore::new()),
        );
        let options = FsOptions {
            create_table: true,
            ..FsOptions::default()
        };
        RecordStore::new(manager, &options).unwrap()
    }

    #[test]
    fn test_postgres_placeholders() {
        let statements = Statements::render(BackendKind::Postgres, "code");
        assert_eq!(statements.update_code, "UPDATE code SET code = $1 WHERE name = $2");
        assert_eq!(statements.insert, "INSERT INTO code (name, code) VALUES ($1, $2)");
    }

    #[test]
    fn test_mysql_placeholders() {
        let statements = Statements::render(BackendKind::Mysql, "zzz_misccode");
        assert_eq!(statements.exists, "SELECT name FROM zzz_misccode WHERE name = ?");
        assert_eq!(statements.delete, "DELETE FROM zzz_misccode WHERE name = ?");
    }

    #[test]
    fn test_rejects_invalid_table() {
        let manager = ConnectionManager::new(
            ConnectionSettings::sqlite(":memory:"),
            Arc::new(MemorySecretStore::new()),
        );
        let options = FsOptions {
            table: "bad name".to_string(),
            ..FsOptions::default()
        };
        assert!(RecordStore::new(manager, &options).is_err());
    }

    #[tokio::test]
    async fn test_write_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir);

        assert_eq!(store.write("a", "1", false, false).await.unwrap(), WriteOutcome::Missing);
        assert!(!store.exists("a").await.unwrap());

        assert_eq!(store.write("a", "1", true, false).await.unwrap(), WriteOutcome::Created);
        assert_eq!(store.write("a", "2", true, false).await.unwrap(), WriteOutcome::Conflict);
        assert_eq!(store.code("a").await.unwrap().as_deref(), Some("1"));

        assert_eq!(store.write("a", "3", false, false).await.unwrap(), WriteOutcome::Updated);
        assert_eq!(store.write("a", "4", true, true).await.unwrap(), WriteOutcome::Updated);
        assert_eq!(store.code("a").await.unwrap().as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_rename_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir);
        store.write("a", "alpha", true, false).await.unwrap();
        store.write("b", "beta", true, false).await.unwrap();

        assert_eq!(store.rename("x", "y", true).await.unwrap(), RenameOutcome::SourceMissing);
        assert_eq!(
            store.rename("a", "b", false).await.unwrap(),
            RenameOutcome::DestinationExists
        );
        assert_eq!(store.rename("a", "a", false).await.unwrap(), RenameOutcome::Renamed);
        assert_eq!(store.code("a").await.unwrap().as_deref(), Some("alpha"));

        assert_eq!(store.rename("a", "b", true).await.unwrap(), RenameOutcome::Renamed);
        assert!(!store.exists("a").await.unwrap());
        assert_eq!(store.code("b").await.unwrap().as_deref(), Some("alpha"));
        assert_eq!(store.names().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir);
        store.write("a", "1", true, false).await.unwrap();

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.code("a").await.unwrap().is_none());
    }
}
