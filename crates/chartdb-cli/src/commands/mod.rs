//! CLI command implementations.

pub mod collections;
pub mod export;
pub mod import_legacy;
pub mod load;
pub mod stats;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use chartdb_core::{CancelToken, Database, DatabaseConfig, Notice};
use owo_colors::OwoColorize;
use tracing::{debug, warn};

use crate::osu_file::OsuFileLoader;

const TICK: Duration = Duration::from_millis(16);

/// Loads the database, printing progress; Ctrl-C cancels the load.
pub fn open_database(config: DatabaseConfig) -> Result<Database> {
    let cancel = CancelToken::new();
    let cancel_ctrlc = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling...");
        cancel_ctrlc.cancel();
    })?;

    let mut db = Database::new(config).with_loader(Arc::new(OsuFileLoader));
    db.begin_load(cancel.clone())?;

    let mut last_percent = None;
    while db.is_loading() {
        db.update();
        let percent = (db.progress() * 100.0) as u32;
        if last_percent != Some(percent) {
            debug!("Loading {}%", percent);
            last_percent = Some(percent);
        }
        thread::sleep(TICK);
    }

    print_notices(db.notices());
    if cancel.is_cancelled() {
        bail!("Load cancelled");
    }
    Ok(db)
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::SaveFailed { .. } | Notice::VersionTooOld { .. } => {
                eprintln!("{} {}", "error:".red().bold(), notice)
            }
            _ => eprintln!("{} {}", "note:".yellow().bold(), notice),
        }
    }
}

/// Saves everything and turns a failure into an error exit.
pub fn save(db: &mut Database) -> Result<()> {
    if !db.save() {
        warn!("Some files could not be saved");
        print_notices(db.notices());
        bail!("Save failed");
    }
    Ok(())
}
