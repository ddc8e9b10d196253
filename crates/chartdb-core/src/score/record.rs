use serde::Serialize;

use crate::config::versions::SCORES_VERSION;

/// Legacy mod bits that matter to this crate.
pub mod mods {
    pub const RELAX: u32 = 1 << 7;
    pub const AUTOPILOT: u32 = 1 << 13;
    /// Legacy score records carry one extra `f64` when this bit is set.
    pub const TARGET_PRACTICE: u32 = 1 << 23;
}

/// One recorded play against a difficulty.
///
/// Scores are stored per difficulty hash in the
/// [`ScoreStore`](super::ScoreStore); the hash itself is the bucket key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Score {
    /// Client/format version that produced the score.
    pub version: i32,
    pub game_mode: u8,
    /// Unix timestamp in seconds. Unique within a hash bucket.
    pub timestamp: u64,
    pub player_name: String,

    pub num300: u32,
    pub num100: u32,
    pub num50: u32,
    pub num_gekis: u32,
    pub num_katus: u32,
    pub num_misses: u32,

    pub score: u64,
    pub combo_max: u32,
    pub perfect: bool,
    pub mods: u32,

    /// Read from the external application's score file.
    pub legacy: bool,
    /// Our own copy of a score originally imported from the legacy file.
    pub imported_legacy: bool,

    // Only meaningful for non-legacy scores
    pub num_slider_breaks: u32,
    pub pp: f32,
    pub unstable_rate: f32,
    pub hit_error_avg_min: f32,
    pub hit_error_avg_max: f32,
    pub stars_total: f32,
    pub stars_aim: f32,
    pub stars_speed: f32,
    pub speed_multiplier: f32,
    pub cs: f32,
    pub ar: f32,
    pub od: f32,
    pub hp: f32,
    pub max_possible_combo: i32,
    pub num_hit_objects: i32,
    pub num_circles: i32,
    pub experimental_mods: String,

    pub online_score_id: i64,

    /// Tie-breaker assigned on insertion; never persisted.
    #[serde(skip)]
    pub sort_hack: u64,
}

impl Score {
    /// A blank non-legacy score at the current format version.
    pub fn new() -> Self {
        Self {
            version: SCORES_VERSION,
            speed_multiplier: 1.0,
            ..Self::default()
        }
    }

    /// Standard-mode accuracy in `0.0..=1.0`.
    pub fn accuracy(&self) -> f64 {
        let total = u64::from(self.num300)
            + u64::from(self.num100)
            + u64::from(self.num50)
            + u64::from(self.num_misses);
        if total == 0 {
            return 0.0;
        }
        let points = 300 * u64::from(self.num300)
            + 100 * u64::from(self.num100)
            + 50 * u64::from(self.num50);
        points as f64 / (300 * total) as f64
    }

    pub fn has_mods(&self, mask: u32) -> bool {
        self.mods & mask != 0
    }

    /// Whether two records describe the same play, ignoring provenance and
    /// fields only our own format stores.
    pub fn same_play(&self, other: &Score) -> bool {
        self.timestamp == other.timestamp
            && self.player_name == other.player_name
            && self.num300 == other.num300
            && self.num100 == other.num100
            && self.num50 == other.num50
            && self.num_gekis == other.num_gekis
            && self.num_katus == other.num_katus
            && self.num_misses == other.num_misses
            && self.score == other.score
            && self.combo_max == other.combo_max
            && self.mods == other.mods
    }
}
