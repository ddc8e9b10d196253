//! Incremental filesystem scan of the songs folder.
//!
//! Used when the external database cannot be trusted. The scan is a
//! resumable state machine: [`RawScanner::begin_pass`] lists the folders not
//! seen yet, and each [`RawScanner::step`] processes folders until its time
//! budget runs out. Folders already scanned and the charts built from them
//! survive cancellation, so a later pass only picks up what is new.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::chart::{ChartKey, ChartLibrary, Difficulty};
use crate::error::Result;
use crate::storage::StarsCache;

/// Turns one chart folder into its difficulties.
///
/// Implementations parse the chart files inside `folder`; a folder without
/// any usable chart yields an empty list.
pub trait DifficultyLoader: Send + Sync {
    fn load_folder(&self, folder: &Path) -> Vec<Difficulty>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    Running { done: usize, total: usize },
    Finished { added: usize },
    Cancelled,
}

#[derive(Debug, Default)]
pub struct RawScanner {
    scanned: HashSet<PathBuf>,
    pending: VecDeque<PathBuf>,
    total: usize,
    added: usize,
    game_mode: u8,
}

impl RawScanner {
    /// Creates a scanner keeping only difficulties of `game_mode`.
    pub fn new(game_mode: u8) -> Self {
        Self {
            game_mode,
            ..Self::default()
        }
    }

    /// Queues every sub-folder of `songs_folder` not scanned before.
    ///
    /// Returns the number of queued folders.
    pub fn begin_pass(&mut self, songs_folder: &Path) -> Result<usize> {
        let mut folders: Vec<PathBuf> = fs::read_dir(songs_folder)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| !self.scanned.contains(path))
            .collect();
        folders.sort();

        debug!(
            "Raw scan of {:?}: {} new folders, {} already scanned",
            songs_folder,
            folders.len(),
            self.scanned.len()
        );

        self.total = folders.len();
        self.added = 0;
        self.pending = folders.into();
        Ok(self.total)
    }

    /// Whether a pass has folders left.
    pub fn is_active(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.total - self.pending.len()) as f32 / self.total as f32
    }

    /// Processes queued folders until `budget` is spent or the queue is empty.
    ///
    /// At least one folder is processed per call. Difficulties of other game
    /// modes are dropped. `stars` is `None` when the
    /// stars cache is disabled, which resets every rating to 0. On
    /// cancellation the rest of the queue is dropped; scanned folders and
    /// their charts stay.
    pub fn step(
        &mut self,
        loader: &dyn DifficultyLoader,
        library: &mut ChartLibrary,
        stars: Option<&StarsCache>,
        budget: Duration,
        cancel: &CancelToken,
    ) -> ScanProgress {
        let start = Instant::now();

        while let Some(folder) = self.pending.pop_front() {
            if cancel.is_cancelled() {
                self.pending.clear();
                info!("Raw scan cancelled after {} new charts", self.added);
                return ScanProgress::Cancelled;
            }

            let mut difficulties = loader.load_folder(&folder);
            self.scanned.insert(folder.clone());
            difficulties.retain(|d| d.game_mode == self.game_mode);

            if !difficulties.is_empty() {
                for difficulty in &mut difficulties {
                    let rating = match stars {
                        Some(cache) => cache.get(&difficulty.hash).unwrap_or(difficulty.stars()),
                        None => 0.0,
                    };
                    difficulty.set_stars(rating);
                }
                let key = folder
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                library.add_chart(ChartKey::Folder(key), difficulties);
                self.added += 1;
            }

            if start.elapsed() >= budget && !self.pending.is_empty() {
                return ScanProgress::Running {
                    done: self.total - self.pending.len(),
                    total: self.total,
                };
            }
        }

        info!("Raw scan finished, {} new charts", self.added);
        ScanProgress::Finished { added: self.added }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Md5Hash;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One difficulty per folder containing a `map.osu`, hashed by folder name.
    #[derive(Default)]
    struct FakeLoader {
        calls: AtomicUsize,
    }

    impl DifficultyLoader for FakeLoader {
        fn load_folder(&self, folder: &Path) -> Vec<Difficulty> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !folder.join("map.osu").exists() {
                return Vec::new();
            }
            let name = folder.file_name().unwrap().to_string_lossy();
            let hash = Md5Hash::parse(&format!("{:0>32}", name)).unwrap();
            let mut d = Difficulty::new(hash);
            if name.starts_with("mania") {
                d.game_mode = 3;
            }
            d.set_stars(2.0);
            vec![d]
        }
    }

    fn songs_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            let folder = dir.path().join(name);
            fs::create_dir(&folder).unwrap();
            fs::write(folder.join("map.osu"), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_second_pass_adds_nothing() {
        let dir = songs_dir(&["1", "2", "3"]);
        fs::create_dir(dir.path().join("empty")).unwrap();
        let loader = FakeLoader::default();
        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(0);
        let cancel = CancelToken::new();

        assert_eq!(scanner.begin_pass(dir.path()).unwrap(), 4);
        let progress = scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(progress, ScanProgress::Finished { added: 3 });
        assert_eq!(library.len(), 3);

        assert_eq!(scanner.begin_pass(dir.path()).unwrap(), 0);
        let progress = scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(progress, ScanProgress::Finished { added: 0 });
        assert_eq!(library.len(), 3);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zero_budget_processes_one_folder_per_step() {
        let dir = songs_dir(&["1", "2"]);
        let loader = FakeLoader::default();
        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(0);
        let cancel = CancelToken::new();

        scanner.begin_pass(dir.path()).unwrap();
        let first = scanner.step(&loader, &mut library, None, Duration::ZERO, &cancel);
        assert_eq!(first, ScanProgress::Running { done: 1, total: 2 });
        assert!(scanner.is_active());
        assert_eq!(scanner.progress(), 0.5);

        let second = scanner.step(&loader, &mut library, None, Duration::ZERO, &cancel);
        assert_eq!(second, ScanProgress::Finished { added: 2 });
    }

    #[test]
    fn test_cancel_keeps_scanned_folders() {
        let dir = songs_dir(&["1", "2", "3"]);
        let loader = FakeLoader::default();
        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(0);
        let cancel = CancelToken::new();

        scanner.begin_pass(dir.path()).unwrap();
        scanner.step(&loader, &mut library, None, Duration::ZERO, &cancel);
        cancel.cancel();
        let progress = scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(progress, ScanProgress::Cancelled);
        assert_eq!(library.len(), 1);
        assert!(!scanner.is_active());

        // Resuming only picks up what was not scanned yet
        cancel.reset();
        assert_eq!(scanner.begin_pass(dir.path()).unwrap(), 2);
        scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(library.len(), 3);
    }

    #[test]
    fn test_stars_cache_applied() {
        let dir = songs_dir(&["7"]);
        let loader = FakeLoader::default();
        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(0);
        let hash = Md5Hash::parse(&format!("{:0>32}", "7")).unwrap();
        let mut cache = StarsCache::new();
        cache.insert(hash, 5.5);

        scanner.begin_pass(dir.path()).unwrap();
        scanner.step(
            &loader,
            &mut library,
            Some(&cache),
            Duration::MAX,
            &CancelToken::new(),
        );
        assert_eq!(library.difficulty(&hash).unwrap().stars(), 5.5);
    }

    #[test]
    fn test_other_game_modes_skipped() {
        let dir = songs_dir(&["1", "mania2"]);
        let loader = FakeLoader::default();
        let cancel = CancelToken::new();

        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(0);
        scanner.begin_pass(dir.path()).unwrap();
        let progress = scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(progress, ScanProgress::Finished { added: 1 });
        assert_eq!(library.len(), 1);
        assert!(library.charts()[0]
            .difficulties()
            .iter()
            .all(|d| d.game_mode == 0));

        let mut library = ChartLibrary::new();
        let mut scanner = RawScanner::new(3);
        scanner.begin_pass(dir.path()).unwrap();
        scanner.step(&loader, &mut library, None, Duration::MAX, &cancel);
        assert_eq!(library.len(), 1);
        assert_eq!(library.charts()[0].difficulties()[0].game_mode, 3);
    }

    #[test]
    fn test_missing_songs_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut scanner = RawScanner::new(0);
        assert!(scanner.begin_pass(&dir.path().join("missing")).is_err());
    }
}
