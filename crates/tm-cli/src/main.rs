//! tidemark CLI - applies versioned SQL migrations to a primary database
//! and its replicas

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{create, drop, dump, migrate, new, rollback, status, up, wait};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match &cli.command {
        Commands::New(args) => new::execute(args, &cli.global),
        Commands::Create => create::execute(&cli.global),
        Commands::Drop => drop::execute(&cli.global),
        Commands::Up => up::execute(&cli.global),
        Commands::Migrate => migrate::execute(&cli.global),
        Commands::Rollback => rollback::execute(&cli.global),
        Commands::Status(args) => status::execute(args, &cli.global),
        Commands::Dump => dump::execute(&cli.global),
        Commands::Wait => wait::execute(&cli.global),
    }
}
