//! Error types for tm-db

use thiserror::Error;

/// Driver-layer errors
#[derive(Error, Debug)]
pub enum DbError {
    /// No backend registered for the URL scheme (D001)
    #[error("[D001] unsupported driver: {scheme}")]
    UnsupportedDriver { scheme: String },

    /// Connection error with preserved source chain (D002)
    #[error("[D002] database connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    /// SQL execution error (D007)
    #[error("[D007] SQL execution failed: {0}")]
    ExecutionError(String),

    /// SQLite driver error with preserved source chain (D003)
    #[error("[D003] SQL execution failed")]
    Sqlite(#[source] rusqlite::Error),

    /// Transaction management error (D004)
    #[error("[D004] transaction failed: {0}")]
    TransactionError(String),

    /// Schema dump error (D005)
    #[error("[D005] schema dump failed: {0}")]
    DumpError(String),

    /// Filesystem error with path context (D006)
    #[error("[D006] {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for [`DbError`]
pub type DbResult<T> = Result<T, DbError>;

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sqlite(err)
    }
}
