//! On-disk formats owned or read by the database.

pub mod collection_file;
pub mod report;
pub mod score_file;
mod stars_cache;

pub use collection_file::{load_collections, save_collections, CollectionSource};
pub use report::export_scores_tsv;
pub use score_file::{load_legacy_scores, load_scores, save_scores, ScoreLoadReport};
pub use stars_cache::{StarsCache, STARS_FAILED_SENTINEL};
