mod cli;
mod commands;
mod osu_file;

use anyhow::Result;
use chartdb_core::DatabaseConfig;
use clap::Parser;
use cli::{Args, Command};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chartdb=info,chartdb_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match DatabaseConfig::load(&args.config) {
        Ok(config) => {
            info!("Loaded config from {:?}", args.config);
            config
        }
        Err(e) => {
            warn!("Failed to load config {:?}: {}, using defaults", args.config, e);
            DatabaseConfig::default()
        }
    };

    match args.command {
        Command::Load { json } => commands::load::run(config, json),
        Command::Stats { player, top, json } => commands::stats::run(config, &player, top, json),
        Command::Export { output } => commands::export::run(config, &output),
        Command::Collections { action } => commands::collections::run(config, action),
        Command::ImportLegacy => commands::import_legacy::run(config),
    }
}
