//! URL-scheme driver registry
//!
//! Backends register a constructor against one or more URL schemes. The
//! table is a compile-time constant and read-only for the life of the
//! process.

use crate::driver::{Driver, DriverConfig};
use crate::error::{DbError, DbResult};
use crate::sqlite;

/// Driver constructor signature.
pub type DriverCtor = fn(DriverConfig) -> Box<dyn Driver>;

static DRIVERS: &[(&str, DriverCtor)] = &[
    ("sqlite", sqlite::driver),
    ("sqlite3", sqlite::driver),
];

/// Construct the driver selected by `config.url`'s scheme.
pub fn driver_for(config: DriverConfig) -> DbResult<Box<dyn Driver>> {
    let scheme = config.url.scheme().to_string();
    match DRIVERS.iter().find(|(name, _)| *name == scheme) {
        Some((_, ctor)) => Ok(ctor(config)),
        None => Err(DbError::UnsupportedDriver { scheme }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config(url: &str) -> DriverConfig {
        DriverConfig {
            url: Url::parse(url).unwrap(),
            migrations_table: "schema_migrations".to_string(),
        }
    }

    #[test]
    fn test_sqlite_schemes_resolve() {
        assert!(driver_for(config("sqlite:app.db")).is_ok());
        assert!(driver_for(config("sqlite3:app.db")).is_ok());
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let err = driver_for(config("oracle://host/app")).unwrap_err();
        match err {
            DbError::UnsupportedDriver { scheme } => assert_eq!(scheme, "oracle"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
