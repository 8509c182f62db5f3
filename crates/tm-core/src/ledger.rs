//! Ledger access
//!
//! Thin wrapper over the driver's ledger operations that guarantees the
//! ledger table exists before any read. Handles acquired here are released
//! when the `Ledger` drops, on success and error paths alike.

use std::collections::HashSet;
use tm_db::{DbResult, Driver, Handle};

pub(crate) struct Ledger {
    handle: Box<dyn Handle>,
}

impl Ledger {
    /// Open a handle on `driver` and bootstrap the ledger table.
    pub(crate) fn open(driver: &dyn Driver) -> DbResult<Self> {
        let handle = driver.open()?;
        handle.create_migrations_table()?;
        Ok(Self { handle })
    }

    /// The set of applied versions.
    pub(crate) fn applied(&self) -> DbResult<HashSet<String>> {
        self.handle.applied_migrations()
    }

    /// The most recently applied version, if any.
    pub(crate) fn latest(&self) -> DbResult<Option<String>> {
        self.handle.latest_migration()
    }

    /// The underlying handle, for block execution.
    pub(crate) fn handle(&self) -> &dyn Handle {
        self.handle.as_ref()
    }
}
