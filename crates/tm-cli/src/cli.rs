//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tidemark - database schema migrations for a primary and its replicas
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Primary database URL
    #[arg(short = 'u', long, global = true, env = "DATABASE_URL")]
    pub url: Option<String>,

    /// Replica database URL (repeatable)
    #[arg(long = "replica-url", global = true, value_name = "URL")]
    pub replica_urls: Vec<String>,

    /// Directory containing migration files
    #[arg(
        short = 'd',
        long,
        global = true,
        default_value = tm_core::DEFAULT_MIGRATIONS_DIR
    )]
    pub migrations_dir: PathBuf,

    /// Name of the table recording applied migrations
    #[arg(long, global = true, default_value = tm_core::DEFAULT_MIGRATIONS_TABLE)]
    pub migrations_table: String,

    /// Destination of schema dumps
    #[arg(short = 's', long, global = true, default_value = tm_core::DEFAULT_SCHEMA_FILE)]
    pub schema_file: PathBuf,

    /// Skip the automatic schema dump after migrate/rollback
    #[arg(long, global = true)]
    pub no_dump_schema: bool,

    /// Substitute {{IDENT}} wildcards in migration blocks
    #[arg(long, global = true)]
    pub wildcards: bool,

    /// Wait for the database to become available before running
    #[arg(long, global = true)]
    pub wait: bool,

    /// Seconds between connection attempts
    #[arg(long, global = true, default_value = "1", value_name = "SECS")]
    pub wait_interval: u64,

    /// Maximum seconds to wait for a connection, per database
    #[arg(long, global = true, default_value = "60", value_name = "SECS")]
    pub wait_timeout: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new migration file
    New(NewArgs),

    /// Create the primary database and every replica
    Create,

    /// Drop the primary database and every replica
    Drop,

    /// Create the databases if necessary, then migrate
    Up,

    /// Apply pending migrations
    Migrate,

    /// Roll back the most recent migration
    #[command(alias = "down")]
    Rollback,

    /// Show the status of all migrations
    Status(StatusArgs),

    /// Write the primary's schema to the schema file
    Dump,

    /// Block until the primary database accepts connections
    Wait,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Name of the migration, e.g. `create_users`
    pub name: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Exit with code 1 when any migrations are pending
    #[arg(long)]
    pub exit_code: bool,

    /// Suppress output, only compute the pending count
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_args() {
        // Validates the entire command tree: short flag conflicts,
        // duplicate args, and other clap definition errors.
        Cli::command().debug_assert();
    }
}
