//! tm-db - database driver layer for tidemark
//!
//! This crate provides the [`Driver`] and [`Handle`] capability traits the
//! migration engine runs against, the URL-scheme registry that selects a
//! backend, and the built-in SQLite backend.

pub mod driver;
pub mod error;
pub mod registry;
pub mod sqlite;

pub use driver::{wildcards_from_url, Driver, DriverConfig, Handle, Wildcards};
pub use error::{DbError, DbResult};
pub use registry::driver_for;
pub use sqlite::SqliteDriver;
