//! New command implementation - scaffolds a migration file

use anyhow::Result;

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::migrator;

/// Execute the new command
pub(crate) fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let mut migrator = migrator(global)?;
    migrator.new_migration(&args.name)?;
    Ok(())
}
