//! Up command implementation - create the databases if needed, then migrate

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::migrator;

/// Execute the up command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let mut migrator = migrator(global)?;
    migrator.create_and_migrate()?;
    Ok(())
}
