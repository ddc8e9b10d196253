//! Scores, their orderings and the statistics derived from them.

mod record;
mod sort;
pub mod stats;
mod store;

pub use record::{mods, Score};
pub use sort::SortMethod;
pub use stats::{PlayerPpScores, PlayerStats, RankedScore, StatsAggregator};
pub use store::ScoreStore;
