//! Status command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::migrator;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let mut migrator = migrator(global)?;
    let pending = migrator.status(args.quiet)?;

    if args.exit_code && pending > 0 {
        std::process::exit(1);
    }
    Ok(())
}
