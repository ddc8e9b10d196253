//! Database configuration.
//!
//! `DatabaseConfig` is passed explicitly to the loaders and aggregators; it
//! can be read from a TOML file, any missing key falling back to its default.
//! Fixed format boundaries live in [`versions`].

pub mod versions;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::score::SortMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Installation folder of the external application.
    pub osu_folder: PathBuf,
    /// Chart folders; relative paths are resolved against `osu_folder`.
    pub songs_folder: PathBuf,
    /// Where our own files are kept.
    pub data_folder: PathBuf,

    pub external_db_file: String,
    pub legacy_scores_file: String,
    pub legacy_collections_file: String,
    pub scores_file: String,
    pub collections_file: String,
    pub stars_cache_file: String,

    /// Highest external database version parsed without falling back.
    pub max_supported_version: i32,
    /// Parse newer external databases anyway (best effort).
    pub ignore_version_ceiling: bool,
    pub stars_cache_enabled: bool,

    /// One of the [`SortMethod`] names, e.g. `"Sort By Score"`.
    pub score_sort_method: String,
    pub scores_enabled: bool,
    pub legacy_scores_enabled: bool,
    pub legacy_collections_enabled: bool,
    /// Persist after every mutation instead of only on `save()`.
    pub save_immediately: bool,

    pub include_relax_and_autopilot: bool,
    pub bonus_pp: bool,
    /// Scores above this pp value are ignored by player statistics.
    pub pp_sanity_ceiling: f32,

    /// Game mode whose difficulties are materialized (0 = standard).
    pub game_mode: u8,
    /// Wall-clock budget per raw scan step, in milliseconds.
    pub scan_budget_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            osu_folder: PathBuf::from("."),
            songs_folder: PathBuf::from("Songs"),
            data_folder: PathBuf::from("."),
            external_db_file: "osu!.db".to_string(),
            legacy_scores_file: "scores.db".to_string(),
            legacy_collections_file: "collection.db".to_string(),
            scores_file: "chartdb_scores.db".to_string(),
            collections_file: "collections.db".to_string(),
            stars_cache_file: "stars.cache".to_string(),
            max_supported_version: versions::DB_DEFAULT_MAX_VERSION,
            ignore_version_ceiling: false,
            stars_cache_enabled: true,
            score_sort_method: SortMethod::Score.name().to_string(),
            scores_enabled: true,
            legacy_scores_enabled: true,
            legacy_collections_enabled: true,
            save_immediately: true,
            include_relax_and_autopilot: false,
            bonus_pp: true,
            pp_sanity_ceiling: 10000.0,
            game_mode: 0,
            scan_budget_ms: 33,
        }
    }
}

impl DatabaseConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn songs_path(&self) -> PathBuf {
        self.osu_folder.join(&self.songs_folder)
    }

    pub fn external_db_path(&self) -> PathBuf {
        self.osu_folder.join(&self.external_db_file)
    }

    pub fn legacy_scores_path(&self) -> PathBuf {
        self.osu_folder.join(&self.legacy_scores_file)
    }

    pub fn legacy_collections_path(&self) -> PathBuf {
        self.osu_folder.join(&self.legacy_collections_file)
    }

    pub fn scores_path(&self) -> PathBuf {
        self.data_folder.join(&self.scores_file)
    }

    pub fn collections_path(&self) -> PathBuf {
        self.data_folder.join(&self.collections_file)
    }

    pub fn stars_cache_path(&self) -> PathBuf {
        self.data_folder.join(&self.stars_cache_file)
    }

    /// Whether our scores file resolves to the external application's own
    /// scores file, which must never be written.
    pub fn scores_shadow_legacy(&self) -> bool {
        same_file(&self.scores_path(), &self.legacy_scores_path())
    }

    pub fn scan_budget(&self) -> Duration {
        Duration::from_millis(self.scan_budget_ms)
    }
}

/// Compares canonical paths, falling back to the paths as given when either
/// side does not exist yet.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_supported_version, 20250108);
        assert_eq!(config.scan_budget().as_millis(), 33);
        assert_eq!(config.score_sort_method, "Sort By Score");
        assert!(config.stars_cache_enabled);
        assert_ne!(config.scores_path(), config.legacy_scores_path());
        assert!(!config.scores_shadow_legacy());
    }

    #[test]
    fn test_scores_file_shadowing_legacy_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scores.db"), b"osu").unwrap();

        let config = DatabaseConfig {
            osu_folder: dir.path().to_path_buf(),
            data_folder: dir.path().join("."),
            scores_file: "scores.db".to_string(),
            ..Default::default()
        };
        // Different spellings of the same file
        assert_ne!(config.scores_path(), config.legacy_scores_path());
        assert!(config.scores_shadow_legacy());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = DatabaseConfig::parse(
            r#"
osu_folder = "/games/osu"
max_supported_version = 20191106
score_sort_method = "Sort By pp"
"#,
        )
        .unwrap();

        assert_eq!(config.osu_folder, PathBuf::from("/games/osu"));
        assert_eq!(config.max_supported_version, 20191106);
        assert_eq!(config.score_sort_method, "Sort By pp");
        // Unspecified keys keep their defaults
        assert_eq!(config.songs_path(), PathBuf::from("/games/osu/Songs"));
        assert!(config.bonus_pp);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(DatabaseConfig::parse("max_supported_version = \"soon\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DatabaseConfig::load(dir.path().join("nope.toml")).is_err());
    }
}
