//! Driver trait definitions
//!
//! A [`Driver`] describes one database named by a URL; a [`Handle`] is an
//! open connection to it. The migration engine only ever talks to these
//! traits, so backends are interchangeable behind the URL scheme.

use crate::error::DbResult;
use percent_encoding::percent_decode_str;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Mapping substituted into `{{IDENT}}` tokens in migration blocks.
pub type Wildcards = HashMap<String, String>;

/// Configuration handed to a driver constructor.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Database URL. The scheme selected this driver; the rest carries
    /// backend-specific connection parameters.
    pub url: Url,

    /// Name of the ledger table recording applied versions.
    pub migrations_table: String,
}

/// Database-level operations a backend must provide.
pub trait Driver: std::fmt::Debug {
    /// Acquire a logical database handle.
    fn open(&self) -> DbResult<Box<dyn Handle>>;

    /// Test connectivity without asserting that the database exists.
    fn ping(&self) -> DbResult<()>;

    /// Whether the database named in the URL exists.
    fn database_exists(&self) -> DbResult<bool>;

    /// Create the database named in the URL.
    fn create_database(&self) -> DbResult<()>;

    /// Drop the database named in the URL.
    fn drop_database(&self) -> DbResult<()>;

    /// Wildcard mapping for `{{IDENT}}` substitution in migration blocks.
    fn wildcards(&self) -> Wildcards;
}

/// Connection-level operations a backend must provide.
///
/// Ledger reads sort by version descending; ledger mutations issued while a
/// [`Handle::transaction`] body is running execute on the same connection
/// and are covered by that transaction.
pub trait Handle {
    /// Execute one or more SQL statements outside any explicit transaction.
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run `body` inside a transaction: commit on success, roll back on
    /// error and propagate the body's error. A failed rollback supersedes
    /// the body's error.
    fn transaction(&self, body: &mut dyn FnMut() -> DbResult<()>) -> DbResult<()>;

    /// Whether the ledger table exists.
    fn migrations_table_exists(&self) -> DbResult<bool>;

    /// Create the ledger table; a no-op when it already exists.
    fn create_migrations_table(&self) -> DbResult<()>;

    /// The set of all applied versions.
    fn applied_migrations(&self) -> DbResult<HashSet<String>>;

    /// The single most recent applied version, if any.
    fn latest_migration(&self) -> DbResult<Option<String>>;

    /// Record `version` as applied.
    fn insert_migration(&self, version: &str) -> DbResult<()>;

    /// Remove `version`'s ledger row.
    fn delete_migration(&self, version: &str) -> DbResult<()>;

    /// Serialize the database schema to an opaque blob.
    fn dump_schema(&self) -> DbResult<Vec<u8>>;
}

/// Derive the standard wildcard mapping from a database URL.
///
/// `DB_NAME` is the last path segment, `DB_USER`/`DB_PASS` come from the
/// userinfo, and `DB_SCHEMA` is the `search_path` query parameter (first
/// component) falling back to `default_schema`.
pub fn wildcards_from_url(url: &Url, default_schema: &str) -> Wildcards {
    let mut wildcards = Wildcards::new();

    let name = url.path().trim_start_matches('/');
    wildcards.insert("DB_NAME".to_string(), name.to_string());
    // userinfo comes back percent-encoded from the URL parser
    wildcards.insert("DB_USER".to_string(), percent_decoded(url.username()));
    wildcards.insert(
        "DB_PASS".to_string(),
        percent_decoded(url.password().unwrap_or_default()),
    );

    let schema = url
        .query_pairs()
        .find(|(key, _)| key == "search_path")
        .map(|(_, value)| {
            value
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .filter(|schema| !schema.is_empty())
        .unwrap_or_else(|| default_schema.to_string());
    wildcards.insert("DB_SCHEMA".to_string(), schema);

    wildcards
}

fn percent_decoded(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
