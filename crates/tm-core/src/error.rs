//! Error types for tm-core

use thiserror::Error;
use tm_db::DbError;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Database URL missing or unusable (E001)
    #[error("[E001] invalid database url, have you set --url or DATABASE_URL?")]
    InvalidUrl,

    /// Wait controller exhausted its timeout (E002)
    #[error("[E002] unable to connect to database")]
    CantConnect(#[source] DbError),

    /// No migration files matched in the migrations directory (E003)
    #[error("[E003] no migration files found")]
    NoMigrationFiles,

    /// Migrations directory could not be read (E004)
    #[error("[E004] could not find migrations directory `{dir}`")]
    MigrationDirNotFound { dir: String },

    /// No migration file matches the requested version (E005)
    #[error("[E005] can't find migration file: {version}*.sql")]
    MigrationNotFound { version: String },

    /// New migration requested without a name (E006)
    #[error("[E006] please specify a name for the new migration")]
    NoMigrationName,

    /// Target file for a new migration already present (E007)
    #[error("[E007] file already exists: {path}")]
    MigrationAlreadyExist { path: String },

    /// Directory creation failed (E008)
    #[error("[E008] unable to create directory `{dir}`")]
    CreateDirectory {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    /// Migration file without an up block (E009)
    #[error("[E009] every migration must define an up block with '-- migrate:up'")]
    ParseMissingUp,

    /// Statements outside of any block (E010)
    #[error(
        "[E010] statements are not allowed outside of the '-- migrate:up', \
         '-- migrate:up:slave', '-- migrate:down' or '-- migrate:down:slave' blocks"
    )]
    ParseUnexpectedStmt,

    /// Two blocks of the same kind in one file (E011)
    #[error("[E011] migrations may not contain multiple blocks of the same kind")]
    ParseDuplicateBlock,

    /// Rollback with nothing applied on the primary (E012)
    #[error("[E012] can't rollback: no migrations have been applied")]
    NoRollback,

    /// Rollback with replicas out of sync with the primary (E013)
    #[error("[E013] can't rollback: replica(s) are out of sync with the primary")]
    NoRollbackReplicas,

    /// IO error (E014)
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver-layer error
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
