//! Shared helpers for command implementations

use anyhow::{Context, Result};
use std::time::Duration;
use tm_core::{Error, Migrator};
use url::Url;

use crate::cli::GlobalArgs;

/// Build a [`Migrator`] from the global flags.
pub(crate) fn migrator(global: &GlobalArgs) -> Result<Migrator> {
    let url = global.url.as_deref().ok_or(Error::InvalidUrl)?;
    let database_url = Url::parse(url).map_err(|_| Error::InvalidUrl)?;

    let mut replica_urls = Vec::with_capacity(global.replica_urls.len());
    for replica in &global.replica_urls {
        let parsed = Url::parse(replica)
            .map_err(|_| Error::InvalidUrl)
            .with_context(|| format!("replica url `{replica}`"))?;
        replica_urls.push(parsed);
    }

    let mut migrator = Migrator::new(database_url, replica_urls);
    migrator.migrations_dir = global.migrations_dir.clone();
    migrator.migrations_table = global.migrations_table.clone();
    migrator.schema_file = global.schema_file.clone();
    migrator.auto_dump_schema = !global.no_dump_schema;
    migrator.wildcards = global.wildcards;
    migrator.wait_before = global.wait;
    migrator.wait_interval = Duration::from_secs(global.wait_interval);
    migrator.wait_timeout = Duration::from_secs(global.wait_timeout);
    Ok(migrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn global_args(url: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            url: url.map(String::from),
            replica_urls: Vec::new(),
            migrations_dir: PathBuf::from("./db/migrations"),
            migrations_table: "schema_migrations".to_string(),
            schema_file: PathBuf::from("./db/schema.sql"),
            no_dump_schema: false,
            wildcards: false,
            wait: false,
            wait_interval: 1,
            wait_timeout: 60,
            verbose: false,
        }
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let err = migrator(&global_args(None)).unwrap_err();
        assert!(err.to_string().contains("invalid database url"));
    }

    #[test]
    fn test_unparseable_url_is_rejected() {
        assert!(migrator(&global_args(Some("not a url"))).is_err());
    }

    #[test]
    fn test_flags_flow_into_the_migrator() {
        let mut args = global_args(Some("sqlite:app.db"));
        args.no_dump_schema = true;
        args.wildcards = true;
        args.wait = true;
        args.wait_timeout = 5;

        let migrator = migrator(&args).unwrap();
        assert!(!migrator.auto_dump_schema);
        assert!(migrator.wildcards);
        assert!(migrator.wait_before);
        assert_eq!(migrator.wait_timeout, Duration::from_secs(5));
        assert_eq!(migrator.migrations_table, "schema_migrations");
    }
}
