//! Stats command: weighted player statistics.

use anyhow::Result;
use chartdb_core::score::PlayerStats;
use chartdb_core::{Database, DatabaseConfig};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::open_database;

#[derive(Debug, Serialize)]
struct TopScore {
    hash: String,
    title: Option<String>,
    difficulty: Option<String>,
    pp: f32,
    accuracy: f64,
    weighted_pp: f64,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    #[serde(flatten)]
    stats: PlayerStats,
    top: Vec<TopScore>,
}

pub fn run(config: DatabaseConfig, player: &str, top: usize, json: bool) -> Result<()> {
    let mut db = open_database(config)?;
    let report = build_report(&mut db, player, top);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stats = &report.stats;
    println!("{}", stats.name.bold());
    println!("  pp:       {:.2}", stats.pp.green());
    println!("  Accuracy: {:.2}%", stats.accuracy * 100.0);
    println!(
        "  Level:    {} ({:.1}% to next)",
        stats.level,
        stats.percent_to_next_level * 100.0
    );
    println!("  Scores:   {}", stats.num_scores);

    for (i, score) in report.top.iter().enumerate() {
        let name = match (&score.title, &score.difficulty) {
            (Some(title), Some(difficulty)) => format!("{} [{}]", title, difficulty),
            _ => score.hash.clone(),
        };
        println!(
            "  {:>3}. {:>8.2}pp {:>6.2}% {} {}",
            i + 1,
            score.pp,
            score.accuracy * 100.0,
            name,
            format!("({:.1} weighted)", score.weighted_pp).dimmed()
        );
    }
    Ok(())
}

fn build_report(db: &mut Database, player: &str, top: usize) -> StatsReport {
    let stats = db.player_stats(player);
    let selection = db.player_pp_scores(player);

    let top = selection
        .scores
        .iter()
        .take(top)
        .enumerate()
        .map(|(i, ranked)| {
            let difficulty = db.difficulty(&ranked.hash);
            TopScore {
                hash: ranked.hash.to_string(),
                title: difficulty.map(|d| d.title.clone()),
                difficulty: difficulty.map(|d| d.difficulty_name.clone()),
                pp: ranked.score.pp,
                accuracy: ranked.score.accuracy(),
                weighted_pp: f64::from(ranked.score.pp)
                    * chartdb_core::score::stats::weight_for_index(i),
            }
        })
        .collect();

    StatsReport { stats, top }
}
