//! Collections command: list and edit collections.

use anyhow::{Result, bail};
use chartdb_core::{Collection, Database, DatabaseConfig, Md5Hash};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::{open_database, save};
use crate::cli::CollectionAction;

#[derive(Debug, Serialize)]
struct CollectionSummary<'a> {
    name: &'a str,
    legacy: bool,
    charts: usize,
    difficulties: usize,
}

impl<'a> From<&'a Collection> for CollectionSummary<'a> {
    fn from(collection: &'a Collection) -> Self {
        Self {
            name: collection.name(),
            legacy: collection.is_legacy(),
            charts: collection.charts().len(),
            difficulties: collection.len(),
        }
    }
}

pub fn run(mut config: DatabaseConfig, action: CollectionAction) -> Result<()> {
    config.save_immediately = false;
    let mut db = open_database(config)?;

    match action {
        CollectionAction::List { json } => {
            list(&db, json)?;
            return Ok(());
        }
        CollectionAction::Add { name } => db.add_collection(&name)?,
        CollectionAction::Rename { old, new } => db.rename_collection(&old, &new)?,
        CollectionAction::Delete { name } => db.delete_collection(&name)?,
        CollectionAction::AddMap { collection, hash } => {
            if !db.add_to_collection(&collection, &parse_hash(&hash)?)? {
                eprintln!("Already in {}", collection);
            }
        }
        CollectionAction::RemoveMap { collection, hash } => {
            if !db.remove_from_collection(&collection, &parse_hash(&hash)?)? {
                eprintln!("Not in {}", collection);
            }
        }
    }

    save(&mut db)
}

fn parse_hash(hash: &str) -> Result<Md5Hash> {
    match Md5Hash::parse(hash) {
        Some(hash) => Ok(hash),
        None => bail!("Not a 32-character hash: {:?}", hash),
    }
}

fn list(db: &Database, json: bool) -> Result<()> {
    let summaries: Vec<CollectionSummary<'_>> =
        db.collections().iter().map(CollectionSummary::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for summary in &summaries {
        let marker = if summary.legacy {
            "legacy".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{} ({} charts, {} difficulties) {}",
            summary.name.bold(),
            summary.charts,
            summary.difficulties,
            marker
        );
    }
    Ok(())
}
