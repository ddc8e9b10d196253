//! Load orchestration and the public read/write surface.
//!
//! A load runs in two phases. The background phase (scores, stars cache,
//! external database, grouping, collections) runs on its own thread and
//! produces a load result. [`Database::update`] consumes that result on
//! the caller's thread and swaps it in; until then readers keep seeing the
//! previous snapshot. If the external database is unusable the background
//! phase ends early and `update` drives the raw scanner instead, a slice of
//! folders per call.

use std::fmt;
use std::fs;
use std::mem;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::chart::{group_difficulties, Chart, ChartLibrary, Difficulty};
use crate::collection::{Collection, CollectionStore};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::hash::Md5Hash;
use crate::loader::{load_external_db, DifficultyLoader, Outcome, Progress, RawScanner, ScanProgress};
use crate::score::stats::player_pp_scores;
use crate::score::{PlayerPpScores, PlayerStats, Score, ScoreStore, StatsAggregator};
use crate::storage::{
    export_scores_tsv, load_collections, load_legacy_scores, load_scores, save_collections,
    save_scores, CollectionSource, StarsCache,
};

/// User-facing events of a load or save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The external database is too old to read; nothing was loaded.
    VersionTooOld { version: i32, minimum: i32 },
    /// The external database is newer than the ceiling; songs are scanned instead.
    FallbackToRawScan { version: i32 },
    /// The external database could not be used; songs are scanned instead.
    ExternalDbUnavailable { reason: String },
    /// Raw scanning was needed but no difficulty loader is installed.
    NoDifficultyLoader,
    SongsFolderUnreadable { reason: String },
    CorruptEntries { count: usize },
    /// Our score file is from a newer build; it is left untouched.
    ScoresVersionTooNew { version: i32, maximum: i32 },
    ScoreStreamTruncated { legacy: bool },
    /// Our score file resolves to the external score file; scores are
    /// read from it but never written.
    ScoresFileShadowsLegacy { path: String },
    CollectionsUnreadable { legacy: bool, reason: String },
    Cancelled,
    SaveFailed { what: &'static str, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionTooOld { version, minimum } => write!(
                f,
                "Database version {} is too old (minimum {}), nothing loaded",
                version, minimum
            ),
            Self::FallbackToRawScan { version } => write!(
                f,
                "Database version {} is newer than supported, scanning songs folder",
                version
            ),
            Self::ExternalDbUnavailable { reason } => {
                write!(f, "Database unavailable ({}), scanning songs folder", reason)
            }
            Self::NoDifficultyLoader => write!(f, "No chart loader available for scanning"),
            Self::SongsFolderUnreadable { reason } => {
                write!(f, "Cannot scan songs folder: {}", reason)
            }
            Self::CorruptEntries { count } => write!(f, "Skipped {} corrupt entries", count),
            Self::ScoresVersionTooNew { version, maximum } => write!(
                f,
                "Score file version {} is newer than {}, scores will not be saved",
                version, maximum
            ),
            Self::ScoreStreamTruncated { legacy } => write!(
                f,
                "{} score file is corrupt, loaded what could be read",
                if *legacy { "Legacy" } else { "Custom" }
            ),
            Self::ScoresFileShadowsLegacy { path } => write!(
                f,
                "Score file {} is the legacy score file, scores will not be saved",
                path
            ),
            Self::CollectionsUnreadable { legacy, reason } => write!(
                f,
                "{} collections not loaded: {}",
                if *legacy { "Legacy" } else { "Custom" },
                reason
            ),
            Self::Cancelled => write!(f, "Loading cancelled"),
            Self::SaveFailed { what, reason } => write!(f, "Failed to save {}: {}", what, reason),
        }
    }
}

/// Where the live chart library came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LibrarySource {
    None,
    External,
    RawScan,
}

enum Charts {
    Built {
        library: ChartLibrary,
        collections: CollectionStore,
    },
    RawScan,
    /// Loading stopped; the chart library is left empty.
    Aborted,
}

/// Output of the background phase, consumed once by [`Database::update`].
struct LoadResult {
    scores: ScoreStore,
    scores_writable: bool,
    stars: StarsCache,
    charts: Charts,
    notices: Vec<Notice>,
}

struct LoadTask {
    handle: JoinHandle<LoadResult>,
    cancel: CancelToken,
}

struct ScanState {
    cancel: CancelToken,
}

pub struct Database {
    config: DatabaseConfig,
    library: ChartLibrary,
    /// Previous library, dropped on the next `update`.
    retired: Option<ChartLibrary>,
    source: LibrarySource,
    scores: ScoreStore,
    scores_writable: bool,
    stars: StarsCache,
    collections: CollectionStore,
    stats: StatsAggregator,
    loader: Option<Arc<dyn DifficultyLoader>>,
    scanner: RawScanner,
    task: Option<LoadTask>,
    scan: Option<ScanState>,
    progress: Progress,
    notices: Vec<Notice>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        let scores = ScoreStore::new(&config.score_sort_method);
        let scanner = RawScanner::new(config.game_mode);
        Self {
            config,
            library: ChartLibrary::new(),
            retired: None,
            source: LibrarySource::None,
            scores,
            scores_writable: true,
            stars: StarsCache::new(),
            collections: CollectionStore::new(),
            stats: StatsAggregator::new(),
            loader: None,
            scanner,
            task: None,
            scan: None,
            progress: Progress::new(),
            notices: Vec::new(),
        }
    }

    /// Installs the chart-file parser used by raw scans.
    pub fn with_loader(mut self, loader: Arc<dyn DifficultyLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Starts a load on a background thread.
    ///
    /// # Errors
    ///
    /// `LoadInProgress` while a previous load or raw scan is still running.
    pub fn begin_load(&mut self, cancel: CancelToken) -> Result<()> {
        if self.is_loading() {
            return Err(Error::LoadInProgress);
        }

        self.progress.set(0.0);
        self.notices.clear();

        let config = self.config.clone();
        let progress = self.progress.clone();
        let task_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name("chartdb-load".to_string())
            .spawn(move || run_load(&config, &task_cancel, &progress))?;

        info!("Load started");
        self.task = Some(LoadTask { handle, cancel });
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.task.is_some() || self.scan.is_some()
    }

    pub fn progress(&self) -> f32 {
        if self.scan.is_some() {
            return self.scanner.progress();
        }
        self.progress.get()
    }

    /// Notices of the most recent load, plus any save failures since.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Main-loop tick.
    ///
    /// Drops the retired snapshot, finalizes a finished background phase and
    /// advances a pending raw scan by at most one time budget.
    pub fn update(&mut self) {
        self.retired = None;

        let finished = self
            .task
            .as_ref()
            .map(|task| task.handle.is_finished())
            .unwrap_or(false);
        if finished {
            self.finish_task();
        }

        if self.scan.is_some() {
            self.step_scan(self.config.scan_budget());
        }
    }

    /// Blocks until the current load, including any raw scan, is complete.
    pub fn wait_for_load(&mut self) {
        self.retired = None;
        if self.task.is_some() {
            self.finish_task();
        }
        while self.scan.is_some() {
            self.step_scan(self.config.scan_budget());
        }
    }

    fn finish_task(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let result = match task.handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Load thread panicked");
                self.notices.push(Notice::Cancelled);
                self.progress.set(1.0);
                return;
            }
        };

        self.scores = result.scores;
        self.scores_writable = result.scores_writable;
        self.stars = result.stars;
        self.stats.invalidate();
        self.notices.extend(result.notices);

        match result.charts {
            Charts::Built {
                library,
                collections,
            } => {
                self.collections = collections;
                self.retire_library(library);
                self.source = LibrarySource::External;
                self.progress.set(1.0);
                info!(
                    "Loaded {} charts ({} difficulties)",
                    self.library.len(),
                    self.library.num_difficulties()
                );
            }
            Charts::RawScan => self.start_scan(task.cancel),
            Charts::Aborted => {
                self.collections = CollectionStore::new();
                self.retire_library(ChartLibrary::new());
                self.source = LibrarySource::None;
            }
        }
    }

    /// Swaps in `library`, keeping the old one alive until the next update
    /// and pointing collection views at the new charts.
    fn retire_library(&mut self, library: ChartLibrary) {
        self.retired = Some(mem::replace(&mut self.library, library));
        self.collections.rebuild_views(&self.library);
    }

    fn start_scan(&mut self, cancel: CancelToken) {
        if self.loader.is_none() {
            warn!("Raw scan needed but no difficulty loader is installed");
            self.notices.push(Notice::NoDifficultyLoader);
            self.progress.set(1.0);
            return;
        }

        // A previous scan is resumed; anything else is replaced.
        if self.source != LibrarySource::RawScan {
            self.retire_library(ChartLibrary::new());
            self.scanner = RawScanner::new(self.config.game_mode);
            self.source = LibrarySource::RawScan;
        }

        let songs = self.config.songs_path();
        match self.scanner.begin_pass(&songs) {
            Ok(count) => {
                info!("Scanning {} folders in {:?}", count, songs);
                self.scan = Some(ScanState { cancel });
            }
            Err(e) => {
                warn!("Cannot scan {:?}: {}", songs, e);
                self.notices.push(Notice::SongsFolderUnreadable {
                    reason: e.to_string(),
                });
                self.progress.set(1.0);
            }
        }
    }

    fn step_scan(&mut self, budget: Duration) {
        let cancel = match (&self.scan, &self.loader) {
            (Some(scan), Some(_)) => scan.cancel.clone(),
            _ => {
                self.scan = None;
                return;
            }
        };
        let Some(loader) = self.loader.as_ref() else {
            return;
        };
        let stars = self.config.stars_cache_enabled.then_some(&self.stars);

        match self
            .scanner
            .step(loader.as_ref(), &mut self.library, stars, budget, &cancel)
        {
            ScanProgress::Running { .. } => {}
            ScanProgress::Finished { .. } => {
                self.scan = None;
                if self.collections.is_dirty() {
                    self.collections.rebuild_views(&self.library);
                } else {
                    self.collections = load_all_collections(
                        &self.config,
                        &self.library,
                        &cancel,
                        &mut self.notices,
                    );
                }
                self.progress.set(1.0);
            }
            ScanProgress::Cancelled => {
                self.scan = None;
                self.collections.rebuild_views(&self.library);
                self.notices.push(Notice::Cancelled);
            }
        }
    }

    // Read API

    pub fn library(&self) -> &ChartLibrary {
        &self.library
    }

    pub fn charts(&self) -> &[Chart] {
        self.library.charts()
    }

    pub fn chart(&self, hash: &Md5Hash) -> Option<&Chart> {
        self.library.chart(hash)
    }

    pub fn difficulty(&self, hash: &Md5Hash) -> Option<&Difficulty> {
        self.library.difficulty(hash)
    }

    pub fn score_store(&self) -> &ScoreStore {
        &self.scores
    }

    pub fn scores(&self, hash: &Md5Hash) -> &[Score] {
        self.scores.scores(hash)
    }

    pub fn collections(&self) -> &[Collection] {
        self.collections.collections()
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn player_stats(&mut self, player: &str) -> PlayerStats {
        self.stats.player_stats(&self.scores, player, &self.config)
    }

    pub fn player_pp_scores(&self, player: &str) -> PlayerPpScores {
        player_pp_scores(&self.scores, player, &self.config)
    }

    // Mutations

    /// Records a new score. Returns its index in the sorted bucket.
    pub fn add_score(&mut self, hash: &str, score: Score) -> Result<Option<usize>> {
        let index = self.scores.add_score(hash, score)?;
        self.persist_scores();
        Ok(index)
    }

    pub fn delete_score(&mut self, hash: &Md5Hash, timestamp: u64) -> bool {
        let deleted = self.scores.delete_score(hash, timestamp);
        if deleted {
            self.persist_scores();
        }
        deleted
    }

    /// Copies all legacy scores into our own score file.
    pub fn import_legacy_scores(&mut self) -> usize {
        let imported = self.scores.import_legacy_scores();
        if imported > 0 {
            self.persist_scores();
        }
        imported
    }

    pub fn set_score_sort_method(&mut self, name: &str) {
        self.config.score_sort_method = name.to_string();
        self.scores.set_sort_method(name);
    }

    /// Stores an externally computed star rating.
    pub fn set_stars(&mut self, hash: &Md5Hash, stars: f32) -> bool {
        let found = self.library.set_stars(hash, stars);
        if found && self.config.stars_cache_enabled {
            self.stars.insert(*hash, stars);
        }
        found
    }

    pub fn add_collection(&mut self, name: &str) -> Result<()> {
        self.collections.add_collection(name)?;
        self.persist_collections();
        Ok(())
    }

    pub fn rename_collection(&mut self, old: &str, new: &str) -> Result<()> {
        self.collections.rename_collection(old, new)?;
        self.persist_collections();
        Ok(())
    }

    pub fn delete_collection(&mut self, name: &str) -> Result<()> {
        self.collections.delete_collection(name)?;
        self.persist_collections();
        Ok(())
    }

    pub fn add_to_collection(&mut self, collection: &str, hash: &Md5Hash) -> Result<bool> {
        let added = self
            .collections
            .add_difficulty(collection, hash, &self.library)?;
        if added {
            self.persist_collections();
        }
        Ok(added)
    }

    pub fn remove_from_collection(&mut self, collection: &str, hash: &Md5Hash) -> Result<bool> {
        let removed = self.collections.remove_difficulty(collection, hash)?;
        if removed {
            self.persist_collections();
        }
        Ok(removed)
    }

    /// Writes scores, collections and the stars cache.
    ///
    /// Failures are logged and reported as notices. Returns whether every
    /// write succeeded.
    pub fn save(&mut self) -> bool {
        let scores = self.save_scores();
        let collections = self.save_collections();
        let stars = self.save_stars_cache();
        scores && collections && stars
    }

    /// Writes every non-legacy score to a TSV report.
    pub fn export_scores<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        export_scores_tsv(path, &self.scores, &self.library)
    }

    fn persist_scores(&mut self) {
        if self.config.save_immediately {
            self.save_scores();
        }
    }

    fn persist_collections(&mut self) {
        if self.config.save_immediately {
            self.save_collections();
        }
    }

    fn save_scores(&mut self) -> bool {
        if !self.config.scores_enabled || !self.scores.is_dirty() {
            return true;
        }
        if !self.scores_writable {
            warn!("Not saving scores over a newer or legacy score file");
            return false;
        }
        if self.config.scores_shadow_legacy() {
            warn!("Refusing to overwrite the legacy score file");
            return false;
        }
        if !self.ensure_data_folder("scores") {
            return false;
        }
        match save_scores(self.config.scores_path(), &self.scores) {
            Ok(()) => {
                self.scores.mark_saved();
                true
            }
            Err(e) => self.save_failed("scores", e),
        }
    }

    fn save_collections(&mut self) -> bool {
        if !self.ensure_data_folder("collections") {
            return false;
        }
        match save_collections(self.config.collections_path(), &self.collections) {
            Ok(()) => {
                self.collections.mark_saved();
                true
            }
            Err(e) => self.save_failed("collections", e),
        }
    }

    fn save_stars_cache(&mut self) -> bool {
        if !self.config.stars_cache_enabled || !self.stars.is_dirty() {
            return true;
        }
        if !self.ensure_data_folder("stars cache") {
            return false;
        }
        match self.stars.save(self.config.stars_cache_path()) {
            Ok(()) => true,
            Err(e) => self.save_failed("stars cache", e),
        }
    }

    fn ensure_data_folder(&mut self, what: &'static str) -> bool {
        match fs::create_dir_all(&self.config.data_folder) {
            Ok(()) => true,
            Err(e) => self.save_failed(what, e.into()),
        }
    }

    fn save_failed(&mut self, what: &'static str, e: Error) -> bool {
        error!("Failed to save {}: {}", what, e);
        self.notices.push(Notice::SaveFailed {
            what,
            reason: e.to_string(),
        });
        false
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            let _ = task.handle.join();
        }
    }
}

/// The background phase.
fn run_load(config: &DatabaseConfig, cancel: &CancelToken, progress: &Progress) -> LoadResult {
    let mut notices = Vec::new();

    let (scores, scores_writable) = load_all_scores(config, &mut notices);

    let stars = if config.stars_cache_enabled {
        StarsCache::load(config.stars_cache_path()).unwrap_or_default()
    } else {
        StarsCache::new()
    };

    let charts = match load_external_db(config.external_db_path(), config, &stars, cancel, progress) {
        Ok(Outcome::Parsed(db)) => {
            if db.skipped_corrupt > 0 {
                notices.push(Notice::CorruptEntries {
                    count: db.skipped_corrupt,
                });
            }
            match group_difficulties(db.difficulties, cancel) {
                Ok(library) => {
                    let collections = load_all_collections(config, &library, cancel, &mut notices);
                    Charts::Built {
                        library,
                        collections,
                    }
                }
                Err(_) => {
                    notices.push(Notice::Cancelled);
                    Charts::Aborted
                }
            }
        }
        Ok(Outcome::Fallback { version }) => {
            notices.push(Notice::FallbackToRawScan { version });
            Charts::RawScan
        }
        Err(Error::VersionTooOld { version, minimum }) => {
            notices.push(Notice::VersionTooOld { version, minimum });
            progress.set(1.0);
            Charts::Aborted
        }
        Err(Error::Cancelled) => {
            info!("Load cancelled");
            notices.push(Notice::Cancelled);
            Charts::Aborted
        }
        Err(e) => {
            warn!("External database unusable: {}", e);
            notices.push(Notice::ExternalDbUnavailable {
                reason: e.to_string(),
            });
            Charts::RawScan
        }
    };

    LoadResult {
        scores,
        scores_writable,
        stars,
        charts,
        notices,
    }
}

fn load_all_scores(config: &DatabaseConfig, notices: &mut Vec<Notice>) -> (ScoreStore, bool) {
    let mut store = ScoreStore::new(&config.score_sort_method);
    let mut writable = true;
    if !config.scores_enabled {
        return (store, writable);
    }

    let custom = config.scores_path();
    let shadowed = config.scores_shadow_legacy();
    if shadowed {
        warn!("{:?} is the legacy score file, scores will not be saved", custom);
        writable = false;
        notices.push(Notice::ScoresFileShadowsLegacy {
            path: custom.display().to_string(),
        });
    } else {
        match load_scores(&custom, &mut store, config.game_mode) {
            Ok(report) if report.truncated => {
                notices.push(Notice::ScoreStreamTruncated { legacy: false })
            }
            Ok(_) | Err(Error::NotReady(_)) => {}
            Err(Error::VersionTooNew { version, maximum }) => {
                writable = false;
                notices.push(Notice::ScoresVersionTooNew { version, maximum });
            }
            Err(e) => warn!("Failed to load scores: {}", e),
        }
    }

    if config.legacy_scores_enabled {
        let custom = (!shadowed).then_some(custom.as_path());
        let legacy = config.legacy_scores_path();
        match load_legacy_scores(&legacy, custom, &mut store, config.game_mode) {
            Ok(report) if report.truncated => {
                notices.push(Notice::ScoreStreamTruncated { legacy: true })
            }
            Ok(_) | Err(Error::NotReady(_)) => {}
            Err(e) => warn!("Failed to load legacy scores: {}", e),
        }
    }

    store.sort_all();
    store.mark_saved();
    (store, writable)
}

/// Loads the legacy then the custom collection file against `library`.
fn load_all_collections(
    config: &DatabaseConfig,
    library: &ChartLibrary,
    cancel: &CancelToken,
    notices: &mut Vec<Notice>,
) -> CollectionStore {
    let mut store = CollectionStore::new();

    let mut sources = Vec::with_capacity(2);
    if config.legacy_collections_enabled {
        sources.push((
            config.legacy_collections_path(),
            CollectionSource::Legacy {
                max_version: config.max_supported_version,
            },
        ));
    }
    sources.push((config.collections_path(), CollectionSource::Custom));

    for (path, source) in sources {
        let legacy = matches!(source, CollectionSource::Legacy { .. });
        match load_collections(&path, source, &mut store, library, cancel) {
            Ok(_) | Err(Error::NotReady(_)) => {}
            Err(Error::Cancelled) => {
                notices.push(Notice::Cancelled);
                return CollectionStore::new();
            }
            Err(e) => notices.push(Notice::CollectionsUnreadable {
                legacy,
                reason: e.to_string(),
            }),
        }
    }

    store.mark_saved();
    store
}
