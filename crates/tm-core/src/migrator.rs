//! Migration orchestrator
//!
//! [`Migrator`] ties the file store, the parser, the ledger and the
//! drivers together for every user-facing operation: creating and
//! dropping databases, applying and rolling back migrations across the
//! primary and its replicas, reporting status, dumping the schema and
//! scaffolding new migration files.

use crate::error::{Error, Result};
use crate::files;
use crate::ledger::Ledger;
use crate::migration::{self, Block};
use crate::wait;
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tm_db::{driver_for, DbResult, Driver, DriverConfig, Handle};
use url::Url;

/// Default directory for migration files.
pub const DEFAULT_MIGRATIONS_DIR: &str = "./db/migrations";

/// Default ledger table name.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

/// Default destination of schema dumps.
pub const DEFAULT_SCHEMA_FILE: &str = "./db/schema.sql";

/// Default delay between connection attempts.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum total time to wait for a connection.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Applied/pending state of one migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResult {
    pub filename: String,
    pub applied: bool,
}

/// Which ledger mutation accompanies a block's execution.
enum LedgerAction {
    Insert,
    Delete,
}

/// Orchestrates migrations for one primary database and its replicas.
///
/// Replicas receive the `up:slave`/`down:slave` block variants. Apply
/// order is replicas first, then the primary; rollback order is the
/// primary first, then the replicas, guarded by the requirement that
/// every replica's latest version equals the primary's.
pub struct Migrator {
    /// URL of the primary database.
    pub database_url: Url,

    /// URLs of the replica databases, applied in declaration order.
    pub replica_urls: Vec<Url>,

    /// Directory containing migration files.
    pub migrations_dir: PathBuf,

    /// Name of the ledger table in every target database.
    pub migrations_table: String,

    /// Destination of schema dumps.
    pub schema_file: PathBuf,

    /// Dump the primary's schema after a successful migrate or rollback.
    pub auto_dump_schema: bool,

    /// Wait for connectivity before each operation.
    pub wait_before: bool,

    /// Delay between connection attempts.
    pub wait_interval: Duration,

    /// Maximum total time to wait for a connection, per database.
    pub wait_timeout: Duration,

    /// Substitute `{{IDENT}}` wildcards in block contents before execution.
    pub wildcards: bool,

    /// Sink for user-facing progress output.
    pub log: Box<dyn Write>,
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("database_url", &self.database_url)
            .field("replica_urls", &self.replica_urls)
            .field("migrations_dir", &self.migrations_dir)
            .field("migrations_table", &self.migrations_table)
            .field("schema_file", &self.schema_file)
            .field("auto_dump_schema", &self.auto_dump_schema)
            .field("wait_before", &self.wait_before)
            .field("wait_interval", &self.wait_interval)
            .field("wait_timeout", &self.wait_timeout)
            .field("wildcards", &self.wildcards)
            .finish_non_exhaustive()
    }
}

impl Migrator {
    /// A migrator with default settings, logging to stdout.
    pub fn new(database_url: Url, replica_urls: Vec<Url>) -> Self {
        Self {
            database_url,
            replica_urls,
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            migrations_table: DEFAULT_MIGRATIONS_TABLE.to_string(),
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            auto_dump_schema: true,
            wait_before: false,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            wildcards: false,
            log: Box::new(io::stdout()),
        }
    }

    fn driver_config(&self, url: &Url) -> DriverConfig {
        DriverConfig {
            url: url.clone(),
            migrations_table: self.migrations_table.clone(),
        }
    }

    /// Driver for the primary database.
    fn driver(&self) -> Result<Box<dyn Driver>> {
        Ok(driver_for(self.driver_config(&self.database_url))?)
    }

    /// Drivers for every replica, in declaration order.
    fn replica_drivers(&self) -> Result<Vec<Box<dyn Driver>>> {
        self.replica_urls
            .iter()
            .map(|url| Ok(driver_for(self.driver_config(url))?))
            .collect()
    }

    fn wait_for(&mut self, drivers: &[&dyn Driver]) -> Result<()> {
        wait::wait_for_connection(
            self.log.as_mut(),
            drivers,
            self.wait_interval,
            self.wait_timeout,
        )
    }

    /// Block until the primary database accepts connections.
    pub fn wait(&mut self) -> Result<()> {
        let primary = self.driver()?;
        self.wait_for(&[primary.as_ref()])
    }

    /// Create the primary database and every replica.
    pub fn create_databases(&mut self) -> Result<()> {
        let primary = self.driver()?;
        let replicas = self.replica_drivers()?;
        self.run_create_databases(primary.as_ref(), &replicas)
    }

    fn run_create_databases(
        &mut self,
        primary: &dyn Driver,
        replicas: &[Box<dyn Driver>],
    ) -> Result<()> {
        if self.wait_before {
            self.wait_for(&all_drivers(primary, replicas))?;
        }

        for driver in all_drivers(primary, replicas) {
            driver.create_database()?;
        }
        Ok(())
    }

    /// Drop the primary database and every replica.
    pub fn drop_databases(&mut self) -> Result<()> {
        let primary = self.driver()?;
        let replicas = self.replica_drivers()?;
        self.run_drop_databases(primary.as_ref(), &replicas)
    }

    fn run_drop_databases(
        &mut self,
        primary: &dyn Driver,
        replicas: &[Box<dyn Driver>],
    ) -> Result<()> {
        if self.wait_before {
            self.wait_for(&all_drivers(primary, replicas))?;
        }

        for driver in all_drivers(primary, replicas) {
            driver.drop_database()?;
        }
        Ok(())
    }

    /// Write the primary's schema to the configured schema file.
    pub fn dump_schema(&mut self) -> Result<()> {
        let primary = self.driver()?;

        if self.wait_before {
            self.wait_for(&[primary.as_ref()])?;
        }

        self.write_schema(primary.as_ref())
    }

    fn write_schema(&mut self, driver: &dyn Driver) -> Result<()> {
        let ledger = Ledger::open(driver)?;
        let schema = ledger.handle().dump_schema()?;
        log::debug!("dumped {} bytes of schema", schema.len());

        let _ = writeln!(self.log, "Writing: {}", self.schema_file.display());

        if let Some(parent) = self.schema_file.parent() {
            ensure_dir(parent)?;
        }
        fs::write(&self.schema_file, schema)?;
        Ok(())
    }

    /// Scaffold `<utc timestamp>_<name>.sql` from the template.
    pub fn new_migration(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::NoMigrationName);
        }

        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let filename = format!("{timestamp}_{name}.sql");

        ensure_dir(&self.migrations_dir)?;

        let path = self.migrations_dir.join(&filename);
        let _ = writeln!(self.log, "Creating migration: {}", path.display());

        if path.exists() {
            return Err(Error::MigrationAlreadyExist {
                path: path.display().to_string(),
            });
        }

        fs::write(&path, migration::MIGRATION_TEMPLATE)?;
        Ok(())
    }

    /// Apply all pending migrations to the primary and the replicas.
    pub fn migrate(&mut self) -> Result<()> {
        let primary = self.driver()?;
        let replicas = self.replica_drivers()?;
        self.run_migrate(primary.as_ref(), &replicas)
    }

    fn run_migrate(&mut self, primary: &dyn Driver, replicas: &[Box<dyn Driver>]) -> Result<()> {
        let filenames = files::find_migration_files(&self.migrations_dir)?;
        if filenames.is_empty() {
            return Err(Error::NoMigrationFiles);
        }
        log::debug!(
            "found {} migration files in {}",
            filenames.len(),
            self.migrations_dir.display()
        );

        if self.wait_before {
            self.wait_for(&[primary])?;
            self.wait_for(&replica_refs(replicas))?;
        }

        let primary_ledger = Ledger::open(primary)?;
        let applied = primary_ledger.applied()?;

        let mut replica_ledgers = Vec::with_capacity(replicas.len());
        let mut replica_applied = Vec::with_capacity(replicas.len());
        for replica in replicas {
            let ledger = Ledger::open(replica.as_ref())?;
            replica_applied.push(ledger.applied()?);
            replica_ledgers.push(ledger);
        }

        for filename in &filenames {
            let version = files::migration_version(filename);

            let apply_to_primary = !applied.contains(version);
            let apply_to_replicas: Vec<usize> = (0..replicas.len())
                .filter(|&idx| !replica_applied[idx].contains(version))
                .collect();

            if !apply_to_primary && apply_to_replicas.is_empty() {
                continue;
            }

            let _ = writeln!(
                self.log,
                "Applying: {filename} (primary: {apply_to_primary}, replicas: {})",
                apply_to_replicas.len()
            );

            let parsed = migration::parse_migration_file(&self.migrations_dir.join(filename))?;

            // Replicas first: a failure here must never leave the primary
            // ahead of a replica for the same version.
            for &idx in &apply_to_replicas {
                let outcome = self.apply_block(
                    replicas[idx].as_ref(),
                    replica_ledgers[idx].handle(),
                    &parsed.up_replica,
                    version,
                    LedgerAction::Insert,
                );
                if let Err(err) = outcome {
                    let _ = writeln!(self.log, "- Failed on replica #{}: {err}", idx + 1);
                    return Err(err);
                }
                let _ = writeln!(self.log, "- Applied to replica #{}", idx + 1);
            }

            if apply_to_primary {
                let outcome = self.apply_block(
                    primary,
                    primary_ledger.handle(),
                    &parsed.up,
                    version,
                    LedgerAction::Insert,
                );
                if let Err(err) = outcome {
                    let _ = writeln!(self.log, "- Failed on primary: {err}");
                    return Err(err);
                }
                let _ = writeln!(self.log, "- Applied to primary");
            }
        }

        if self.auto_dump_schema {
            // the migration itself has succeeded; dump failures are not
            // surfaced
            let _ = self.write_schema(primary);
        }

        Ok(())
    }

    /// Roll back the most recently applied migration everywhere.
    pub fn rollback(&mut self) -> Result<()> {
        let primary = self.driver()?;
        let replicas = self.replica_drivers()?;
        self.run_rollback(primary.as_ref(), &replicas)
    }

    fn run_rollback(&mut self, primary: &dyn Driver, replicas: &[Box<dyn Driver>]) -> Result<()> {
        if self.wait_before {
            self.wait_for(&[primary])?;
            self.wait_for(&replica_refs(replicas))?;
        }

        let primary_ledger = Ledger::open(primary)?;
        let latest = primary_ledger.latest()?.ok_or(Error::NoRollback)?;

        let filename = files::find_migration_file(&self.migrations_dir, &latest)?;
        let parsed = migration::parse_migration_file(&self.migrations_dir.join(&filename))?;

        // Every replica must agree with the primary on the latest version
        // before anything is mutated.
        let mut replica_ledgers = Vec::with_capacity(replicas.len());
        for replica in replicas {
            let ledger = Ledger::open(replica.as_ref())?;
            if ledger.latest()?.as_deref() != Some(latest.as_str()) {
                return Err(Error::NoRollbackReplicas);
            }
            replica_ledgers.push(ledger);
        }

        let _ = writeln!(self.log, "Rolling back: {filename}");

        // Rollback order is the mirror image of apply order: the primary
        // steps down before the replicas. The agreement check above is the
        // invariant that permits this.
        let outcome = self.apply_block(
            primary,
            primary_ledger.handle(),
            &parsed.down,
            &latest,
            LedgerAction::Delete,
        );
        if let Err(err) = outcome {
            let _ = writeln!(self.log, "- Failed on primary: {err}");
            return Err(err);
        }
        let _ = writeln!(self.log, "- Rolled back on primary");

        for (idx, ledger) in replica_ledgers.iter().enumerate() {
            let outcome = self.apply_block(
                replicas[idx].as_ref(),
                ledger.handle(),
                &parsed.down_replica,
                &latest,
                LedgerAction::Delete,
            );
            if let Err(err) = outcome {
                let _ = writeln!(self.log, "- Failed on replica #{}: {err}", idx + 1);
                return Err(err);
            }
            let _ = writeln!(self.log, "- Rolled back on replica #{}", idx + 1);
        }

        if self.auto_dump_schema {
            let _ = self.write_schema(primary);
        }

        Ok(())
    }

    /// Report applied/pending state for every migration file and return
    /// the pending count. With `quiet` nothing is emitted.
    pub fn status(&mut self, quiet: bool) -> Result<usize> {
        let primary = self.driver()?;
        self.run_status(primary.as_ref(), quiet)
    }

    fn run_status(&mut self, primary: &dyn Driver, quiet: bool) -> Result<usize> {
        let results = self.migrations_status(primary)?;

        let mut total_applied = 0;
        for result in &results {
            if result.applied {
                total_applied += 1;
            }
            if !quiet {
                let marker = if result.applied { "X" } else { " " };
                let _ = writeln!(self.log, "[{marker}] {}", result.filename);
            }
        }

        let total_pending = results.len() - total_applied;
        if !quiet {
            let _ = writeln!(self.log);
            let _ = writeln!(self.log, "Applied: {total_applied}");
            let _ = writeln!(self.log, "Pending: {total_pending}");
        }

        Ok(total_pending)
    }

    /// Status of every migration file against the primary's ledger.
    ///
    /// Unlike the other operations this never creates the ledger table; a
    /// database without one simply reports everything pending.
    pub fn migrations_status(&self, driver: &dyn Driver) -> Result<Vec<StatusResult>> {
        let filenames = files::find_migration_files(&self.migrations_dir)?;
        if filenames.is_empty() {
            return Err(Error::NoMigrationFiles);
        }

        let handle = driver.open()?;
        let applied = if handle.migrations_table_exists()? {
            handle.applied_migrations()?
        } else {
            HashSet::new()
        };

        Ok(filenames
            .into_iter()
            .map(|filename| {
                let is_applied = applied.contains(files::migration_version(&filename));
                StatusResult {
                    filename,
                    applied: is_applied,
                }
            })
            .collect())
    }

    /// Create any missing databases, then migrate.
    pub fn create_and_migrate(&mut self) -> Result<()> {
        let primary = self.driver()?;
        let replicas = self.replica_drivers()?;
        self.run_create_and_migrate(primary.as_ref(), &replicas)
    }

    fn run_create_and_migrate(
        &mut self,
        primary: &dyn Driver,
        replicas: &[Box<dyn Driver>],
    ) -> Result<()> {
        if self.wait_before {
            self.wait_for(&all_drivers(primary, replicas))?;
        }

        // Creation is skipped when the existence probe itself fails; some
        // servers deny listing databases to the migration role.
        if let Ok(false) = primary.database_exists() {
            primary.create_database()?;
        }
        for replica in replicas.iter() {
            if let Ok(false) = replica.database_exists() {
                replica.create_database()?;
            }
        }

        self.run_migrate(primary, replicas)
    }

    /// Execute one block and its ledger mutation under the block's
    /// transaction policy.
    fn apply_block(
        &self,
        driver: &dyn Driver,
        handle: &dyn Handle,
        block: &Block,
        version: &str,
        action: LedgerAction,
    ) -> Result<()> {
        let sql = block.contents_replaced(&driver.wildcards(), self.wildcards);

        let mut body = || -> DbResult<()> {
            handle.execute_batch(&sql)?;
            match action {
                LedgerAction::Insert => handle.insert_migration(version),
                LedgerAction::Delete => handle.delete_migration(version),
            }
        };

        if block.options.transaction() {
            handle.transaction(&mut body)?;
        } else {
            body()?;
        }
        Ok(())
    }
}

fn all_drivers<'a>(
    primary: &'a dyn Driver,
    replicas: &'a [Box<dyn Driver>],
) -> Vec<&'a dyn Driver> {
    let mut drivers: Vec<&dyn Driver> = Vec::with_capacity(replicas.len() + 1);
    drivers.push(primary);
    drivers.extend(replicas.iter().map(|replica| replica.as_ref()));
    drivers
}

fn replica_refs(replicas: &[Box<dyn Driver>]) -> Vec<&dyn Driver> {
    replicas.iter().map(|replica| replica.as_ref()).collect()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::CreateDirectory {
        dir: dir.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
