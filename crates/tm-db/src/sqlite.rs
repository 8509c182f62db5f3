//! SQLite database backend
//!
//! The database URL names a file: `sqlite:app.db`, `sqlite://db/app.db`
//! and `sqlite:///var/lib/app.db` are all accepted. Creating the database
//! creates the file; dropping it removes the file.

use crate::driver::{wildcards_from_url, Driver, DriverConfig, Handle, Wildcards};
use crate::error::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use url::Url;

/// Construct a SQLite driver; registered for `sqlite` and `sqlite3`.
pub(crate) fn driver(config: DriverConfig) -> Box<dyn Driver> {
    Box::new(SqliteDriver::new(config))
}

/// SQLite backend for one database file.
#[derive(Debug)]
pub struct SqliteDriver {
    config: DriverConfig,
}

impl SqliteDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Filesystem path encoded in the URL.
    pub fn database_path(&self) -> PathBuf {
        connection_path(&self.config.url)
    }

    fn connect(&self) -> DbResult<Connection> {
        let path = self.database_path();
        Connection::open(&path).map_err(|e| DbError::ConnectionFailed {
            message: path.display().to_string(),
            source: e,
        })
    }
}

/// Resolve the file path named by a SQLite URL.
///
/// A host component is kept as the first path segment, so
/// `sqlite://db/app.db` means `./db/app.db`.
fn connection_path(url: &Url) -> PathBuf {
    if url.cannot_be_a_base() {
        return PathBuf::from(url.path());
    }

    let host = url.host_str().unwrap_or_default();
    if host.is_empty() {
        PathBuf::from(url.path())
    } else {
        PathBuf::from(format!("{host}{}", url.path()))
    }
}

impl Driver for SqliteDriver {
    fn open(&self) -> DbResult<Box<dyn Handle>> {
        let conn = self.connect()?;
        Ok(Box::new(SqliteHandle {
            conn,
            migrations_table: self.config.migrations_table.clone(),
        }))
    }

    fn ping(&self) -> DbResult<()> {
        // Opening the file is the strongest connectivity check SQLite has;
        // it creates the file as a side effect, matching create_database.
        self.connect().map(|_| ())
    }

    fn database_exists(&self) -> DbResult<bool> {
        Ok(self.database_path().exists())
    }

    fn create_database(&self) -> DbResult<()> {
        let path = self.database_path();
        log::debug!("creating sqlite database {}", path.display());
        self.connect().map(|_| ())
    }

    fn drop_database(&self) -> DbResult<()> {
        let path = self.database_path();
        if !path.exists() {
            return Ok(());
        }
        log::debug!("removing sqlite database {}", path.display());
        fs::remove_file(&path).map_err(|e| DbError::Io {
            context: format!("unable to remove {}", path.display()),
            source: e,
        })
    }

    fn wildcards(&self) -> Wildcards {
        let mut wildcards = wildcards_from_url(&self.config.url, "main");
        let stem = self
            .database_path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        wildcards.insert("DB_NAME".to_string(), stem);
        wildcards
    }
}

/// An open connection to a SQLite database file.
pub struct SqliteHandle {
    conn: Connection,
    migrations_table: String,
}

impl SqliteHandle {
    fn quoted_table(&self) -> String {
        quote_ident(&self.migrations_table)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Handle for SqliteHandle {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql).map_err(DbError::from)
    }

    fn transaction(&self, body: &mut dyn FnMut() -> DbResult<()>) -> DbResult<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        match body() {
            Ok(()) => self
                .conn
                .execute_batch("COMMIT")
                .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}"))),
            Err(err) => match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => Err(err),
                Err(rollback_err) => Err(DbError::TransactionError(format!(
                    "ROLLBACK failed: {rollback_err}"
                ))),
            },
        }
    }

    fn migrations_table_exists(&self) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [self.migrations_table.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_migrations_table(&self) -> DbResult<()> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (version TEXT PRIMARY KEY)",
                self.quoted_table()
            ))
            .map_err(DbError::from)
    }

    fn applied_migrations(&self) -> DbResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT version FROM {} ORDER BY version DESC",
            self.quoted_table()
        ))?;
        let versions = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(versions)
    }

    fn latest_migration(&self) -> DbResult<Option<String>> {
        let version = self
            .conn
            .query_row(
                &format!(
                    "SELECT version FROM {} ORDER BY version DESC LIMIT 1",
                    self.quoted_table()
                ),
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(version)
    }

    fn insert_migration(&self, version: &str) -> DbResult<()> {
        self.conn.execute(
            &format!("INSERT INTO {} (version) VALUES (?1)", self.quoted_table()),
            [version],
        )?;
        Ok(())
    }

    fn delete_migration(&self, version: &str) -> DbResult<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE version = ?1", self.quoted_table()),
            [version],
        )?;
        Ok(())
    }

    fn dump_schema(&self) -> DbResult<Vec<u8>> {
        let mut stmt = self.conn.prepare(
            "SELECT sql FROM sqlite_master \
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let statements = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut dump = String::new();
        for statement in statements {
            dump.push_str(&statement);
            dump.push_str(";\n");
        }

        if self.migrations_table_exists()? {
            let mut versions: Vec<String> = self.applied_migrations()?.into_iter().collect();
            versions.sort();

            dump.push_str("\n-- applied migrations\n");
            if !versions.is_empty() {
                dump.push_str(&format!(
                    "INSERT INTO {} (version) VALUES\n",
                    self.quoted_table()
                ));
                let rows: Vec<String> = versions
                    .iter()
                    .map(|version| format!("  ({})", quote_text(version)))
                    .collect();
                dump.push_str(&rows.join(",\n"));
                dump.push_str(";\n");
            }
        }

        Ok(dump.into_bytes())
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;
