//! Export command: TSV report of our own scores.

use std::path::Path;

use anyhow::Result;
use chartdb_core::DatabaseConfig;

use super::open_database;

pub fn run(config: DatabaseConfig, output: &Path) -> Result<()> {
    let db = open_database(config)?;
    let rows = db.export_scores(output)?;
    eprintln!("Exported {} scores to {}", rows, output.display());
    Ok(())
}
