//! Load command: full load plus a summary.

use anyhow::Result;
use chartdb_core::{DatabaseConfig, Notice};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::open_database;

#[derive(Debug, Serialize)]
struct LoadSummary<'a> {
    charts: usize,
    difficulties: usize,
    scored_difficulties: usize,
    scores: usize,
    collections: usize,
    notices: &'a [Notice],
}

pub fn run(config: DatabaseConfig, json: bool) -> Result<()> {
    let db = open_database(config)?;

    let summary = LoadSummary {
        charts: db.library().len(),
        difficulties: db.library().num_difficulties(),
        scored_difficulties: db.score_store().len(),
        scores: db.score_store().num_scores(),
        collections: db.collections().len(),
        notices: db.notices(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Library loaded".bold());
    println!("  Charts:       {}", summary.charts.cyan());
    println!("  Difficulties: {}", summary.difficulties.cyan());
    println!(
        "  Scores:       {} on {} difficulties",
        summary.scores.cyan(),
        summary.scored_difficulties
    );
    println!("  Collections:  {}", summary.collections.cyan());
    Ok(())
}
