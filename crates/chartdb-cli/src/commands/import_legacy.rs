//! Import command: copies legacy scores into our own score file.

use anyhow::Result;
use chartdb_core::DatabaseConfig;

use super::{open_database, save};

pub fn run(mut config: DatabaseConfig) -> Result<()> {
    config.save_immediately = false;
    let mut db = open_database(config)?;

    let imported = db.import_legacy_scores();
    if imported == 0 {
        eprintln!("No legacy scores to import");
        return Ok(());
    }

    save(&mut db)?;
    eprintln!("Imported {} legacy scores", imported);
    Ok(())
}
