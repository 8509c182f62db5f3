//! Rollback command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::migrator;

/// Execute the rollback command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let mut migrator = migrator(global)?;
    migrator.rollback()?;
    Ok(())
}
