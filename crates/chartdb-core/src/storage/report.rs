//! Flat tab-separated export of our own scores.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::chart::{ChartLibrary, Difficulty};
use crate::codec::ByteWriter;
use crate::error::Result;
use crate::hash::Md5Hash;
use crate::score::{Score, ScoreStore};

pub fn format_scores_tsv_header() -> String {
    [
        "Timestamp",
        "Hash",
        "Artist",
        "Title",
        "Difficulty",
        "Player",
        "Score",
        "Accuracy",
        "Combo",
        "Max Combo",
        "300",
        "100",
        "50",
        "Miss",
        "Mods",
        "pp",
        "Stars",
        "Unstable Rate",
        "Imported",
    ]
    .join("\t")
}

/// One report line. Chart metadata columns are empty when the difficulty is
/// not part of the loaded library.
pub fn format_score_tsv_row(hash: &Md5Hash, difficulty: Option<&Difficulty>, score: &Score) -> String {
    let (artist, title, name) = difficulty
        .map(|d| (d.artist.as_str(), d.title.as_str(), d.difficulty_name.as_str()))
        .unwrap_or(("", "", ""));

    [
        format_timestamp(score.timestamp),
        hash.to_string(),
        clean(artist),
        clean(title),
        clean(name),
        clean(&score.player_name),
        score.score.to_string(),
        format!("{:.2}", score.accuracy() * 100.0),
        score.combo_max.to_string(),
        score.max_possible_combo.to_string(),
        score.num300.to_string(),
        score.num100.to_string(),
        score.num50.to_string(),
        score.num_misses.to_string(),
        score.mods.to_string(),
        format!("{:.2}", score.pp),
        format!("{:.2}", score.stars_total),
        format!("{:.2}", score.unstable_rate),
        score.imported_legacy.to_string(),
    ]
    .join("\t")
}

/// RFC 3339 in UTC, or the raw number if it does not fit a date.
fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}

fn clean(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// Writes every non-legacy score to `path`, newest first per difficulty and
/// difficulties ordered by hash. Returns the number of rows.
pub fn export_scores_tsv<P: AsRef<Path>>(
    path: P,
    store: &ScoreStore,
    library: &ChartLibrary,
) -> Result<usize> {
    let mut buckets: Vec<(&Md5Hash, &[Score])> = store.iter().collect();
    buckets.sort_by(|a, b| a.0.cmp(b.0));

    let mut lines = vec![format_scores_tsv_header()];
    for (hash, scores) in buckets {
        let difficulty = library.difficulty(hash);
        let mut own: Vec<&Score> = scores.iter().filter(|s| !s.legacy).collect();
        own.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for score in own {
            lines.push(format_score_tsv_row(hash, difficulty, score));
        }
    }

    let rows = lines.len() - 1;
    let mut w = ByteWriter::new();
    w.write_bytes(lines.join("\n").as_bytes());
    w.write_bytes(b"\n");
    w.write(&path)?;

    info!("Exported {} scores to {:?}", rows, path.as_ref());
    Ok(rows)
}
