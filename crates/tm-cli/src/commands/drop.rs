//! Drop command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::migrator;

/// Execute the drop command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let mut migrator = migrator(global)?;
    migrator.drop_databases()?;
    Ok(())
}
