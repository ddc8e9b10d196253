//! Weighted player statistics.
//!
//! A player's best score per difficulty is ranked by pp; rank `i` contributes
//! with weight `0.95^i`. Accuracy uses the same weights and is normalized by
//! their sum. Level follows the total of raw points across the selection.

use serde::Serialize;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::hash::Md5Hash;

use super::record::{mods, Score};
use super::store::ScoreStore;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 120;

const WEIGHT_BASE: f64 = 0.95;
const BONUS_PP_SCALE: f64 = 417.0 - 1.0 / 3.0;
const BONUS_PP_MAX_SCORES: usize = 1000;

/// A player's best score on one difficulty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScore {
    pub hash: Md5Hash,
    pub score: Score,
}

/// Selection feeding [`PlayerStats`], best first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerPpScores {
    pub scores: Vec<RankedScore>,
    /// Sum of raw points of every selected score.
    pub total_score: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    pub pp: f32,
    /// Weighted accuracy in `0.0..=1.0`.
    pub accuracy: f32,
    pub num_scores: usize,
    pub level: u32,
    pub percent_to_next_level: f32,
    pub total_score: u64,
}

pub fn weight_for_index(index: usize) -> f64 {
    WEIGHT_BASE.powi(index.min(i32::MAX as usize) as i32)
}

/// Sum of `weight_for_index(i)` for `i < count`.
pub fn weight_sum(count: usize) -> f64 {
    20.0 * (1.0 - weight_for_index(count))
}

/// Bonus for the number of ranked scores.
pub fn bonus_pp(count: usize) -> f64 {
    let count = count.min(BONUS_PP_MAX_SCORES);
    BONUS_PP_SCALE * (1.0 - 0.995f64.powi(count as i32))
}

/// Total score needed to reach `level`.
pub fn required_score_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 1;
    }
    if level <= 100 {
        let n = f64::from(level);
        let curve = 1666.0 * (4.0 * n.powi(3) - 3.0 * n.powi(2) - n);
        let tail = (1.25 * 1.8f64.powf(n - 60.0)).floor();
        return (curve + tail).floor() as u64;
    }
    26_931_190_829 + 100_000_000_000 * u64::from(level - 100)
}

/// Largest level whose requirement `total_score` meets.
pub fn level_for_score(total_score: u64) -> u32 {
    let mut level = 0;
    for n in 1..=MAX_LEVEL {
        if required_score_for_level(n) > total_score {
            break;
        }
        level = n;
    }
    level
}

/// Progress from the current level towards the next, in `0.0..=1.0`.
pub fn percent_to_next_level(total_score: u64) -> f32 {
    let level = level_for_score(total_score);
    if level >= MAX_LEVEL {
        return 0.0;
    }
    let current = if level == 0 {
        0
    } else {
        required_score_for_level(level)
    };
    let next = required_score_for_level(level + 1);
    let span = next.saturating_sub(current);
    if span == 0 {
        return 0.0;
    }
    (total_score.saturating_sub(current) as f64 / span as f64).clamp(0.0, 1.0) as f32
}

/// Picks the best pp score of `player` on every difficulty.
///
/// Legacy scores carry no pp and are ignored, as are scores above the
/// configured pp ceiling. Relax and autopilot plays are ignored unless the
/// config includes them.
pub fn player_pp_scores(store: &ScoreStore, player: &str, config: &DatabaseConfig) -> PlayerPpScores {
    let excluded = if config.include_relax_and_autopilot {
        0
    } else {
        mods::RELAX | mods::AUTOPILOT
    };

    let mut selected: Vec<RankedScore> = Vec::new();
    let mut total_score = 0u64;

    for (hash, bucket) in store.iter() {
        let best = bucket
            .iter()
            .filter(|s| !s.legacy && s.player_name == player)
            .filter(|s| !s.has_mods(excluded))
            .filter(|s| s.pp <= config.pp_sanity_ceiling)
            .fold(None::<&Score>, |best, s| match best {
                Some(b) if b.pp >= s.pp => Some(b),
                _ => Some(s),
            });

        if let Some(best) = best {
            total_score += best.score;
            selected.push(RankedScore {
                hash: *hash,
                score: best.clone(),
            });
        }
    }

    // Fresh tie-breakers in a stable order so equal pp values rank the same
    // way every time.
    selected.sort_by(|a, b| a.hash.cmp(&b.hash));
    for (i, ranked) in selected.iter_mut().enumerate() {
        ranked.score.sort_hack = i as u64;
    }
    selected.sort_by(|a, b| {
        b.score
            .pp
            .total_cmp(&a.score.pp)
            .then(a.score.sort_hack.cmp(&b.score.sort_hack))
    });

    PlayerPpScores {
        scores: selected,
        total_score,
    }
}

/// Computes weighted statistics from a pp selection.
pub fn calculate_player_stats(player: &str, selection: &PlayerPpScores, bonus: bool) -> PlayerStats {
    let count = selection.scores.len();
    let mut pp = 0.0f64;
    let mut accuracy = 0.0f64;

    for (i, ranked) in selection.scores.iter().enumerate() {
        let weight = weight_for_index(i);
        pp += f64::from(ranked.score.pp) * weight;
        accuracy += ranked.score.accuracy() * weight;
    }

    if bonus {
        pp += bonus_pp(count);
    }
    if count > 0 {
        accuracy /= weight_sum(count);
    }

    PlayerStats {
        name: player.to_string(),
        pp: pp as f32,
        accuracy: accuracy as f32,
        num_scores: count,
        level: level_for_score(selection.total_score),
        percent_to_next_level: percent_to_next_level(selection.total_score),
        total_score: selection.total_score,
    }
}

/// Caches the statistics of the last requested player.
///
/// The cache is dropped when the player changes or the score store reports a
/// new generation. The level is only recomputed when the total score moved.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    cached: Option<CachedStats>,
}

#[derive(Debug)]
struct CachedStats {
    generation: u64,
    stats: PlayerStats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_stats(
        &mut self,
        store: &ScoreStore,
        player: &str,
        config: &DatabaseConfig,
    ) -> PlayerStats {
        let generation = store.stats_generation();
        if let Some(cached) = &self.cached {
            if cached.generation == generation && cached.stats.name == player {
                return cached.stats.clone();
            }
        }

        let selection = player_pp_scores(store, player, config);
        let mut stats = calculate_player_stats(player, &selection, config.bonus_pp);

        if let Some(previous) = self.cached.take() {
            if previous.stats.name == player && previous.stats.total_score == stats.total_score {
                stats.level = previous.stats.level;
                stats.percent_to_next_level = previous.stats.percent_to_next_level;
            }
        }

        debug!(
            "Stats for {}: {:.2}pp over {} scores",
            player, stats.pp, stats.num_scores
        );
        self.cached = Some(CachedStats {
            generation,
            stats: stats.clone(),
        });
        stats
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
