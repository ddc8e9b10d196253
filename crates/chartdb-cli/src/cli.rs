//! CLI argument definitions for chartdb.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chartdb")]
#[command(about = "Chart library, score and collection database", version)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "chartdb.toml", env = "CHARTDB_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load the library and print a summary
    Load {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weighted statistics of a player
    Stats {
        /// Player name as stored in scores
        #[arg(long)]
        player: String,
        /// Number of top scores to list
        #[arg(long, default_value = "10")]
        top: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export our own scores as TSV
    Export {
        /// Output file path
        #[arg(short, long, default_value = "scores.tsv")]
        output: PathBuf,
    },
    /// List and edit collections
    Collections {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Copy legacy scores into our own score file
    ImportLegacy,
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List collections
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an empty collection
    Add { name: String },
    /// Rename a collection
    Rename { old: String, new: String },
    /// Delete a collection
    Delete { name: String },
    /// Add a difficulty (by hash) to a collection
    AddMap { collection: String, hash: String },
    /// Remove a difficulty (by hash) from a collection
    RemoveMap { collection: String, hash: String },
}
