pub mod cancel;
pub mod chart;
pub mod codec;
pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod hash;
pub mod loader;
pub mod score;
pub mod storage;

pub use cancel::CancelToken;
pub use chart::{
    BpmInfo, Chart, ChartId, ChartKey, ChartLibrary, Difficulty, DifficultyStats, TimingPoint,
    group_difficulties,
};
pub use collection::{Collection, CollectionChart, CollectionEntry, CollectionStore};
pub use config::DatabaseConfig;
pub use database::{Database, Notice};
pub use error::{Error, Result};
pub use hash::Md5Hash;
pub use loader::{DifficultyLoader, Progress, RawScanner, ScanProgress};
pub use score::{PlayerPpScores, PlayerStats, Score, ScoreStore, SortMethod, StatsAggregator};
pub use storage::{CollectionSource, ScoreLoadReport, StarsCache};
