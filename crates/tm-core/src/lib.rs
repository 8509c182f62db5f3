//! tm-core - the tidemark migration engine
//!
//! Parses versioned SQL migration files, applies them in order to a primary
//! database and zero or more replicas through the tm-db driver layer, and
//! records applied versions in a per-database ledger table.

pub mod error;
pub mod files;
mod ledger;
pub mod migration;
pub mod migrator;
mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use migration::{Block, BlockOptions, MigrationFile, MIGRATION_TEMPLATE};
pub use migrator::{
    Migrator, StatusResult, DEFAULT_MIGRATIONS_DIR, DEFAULT_MIGRATIONS_TABLE, DEFAULT_SCHEMA_FILE,
    DEFAULT_WAIT_INTERVAL, DEFAULT_WAIT_TIMEOUT,
};
