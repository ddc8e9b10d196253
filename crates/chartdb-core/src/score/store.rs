//! Per-difficulty score history.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::versions::SCORES_MAX_COMBO_VERSION;
use crate::error::Result;
use crate::hash::Md5Hash;

use super::record::Score;
use super::sort::SortMethod;

/// Scores grouped by difficulty hash, each bucket kept in the configured order.
#[derive(Debug, Clone)]
pub struct ScoreStore {
    buckets: HashMap<Md5Hash, Vec<Score>>,
    sort_method: String,
    next_sort_hack: u64,
    dirty: bool,
    generation: u64,
}

impl Default for ScoreStore {
    fn default() -> Self {
        Self::new(SortMethod::Score.name())
    }
}

impl ScoreStore {
    pub fn new(sort_method: &str) -> Self {
        Self {
            buckets: HashMap::new(),
            sort_method: sort_method.to_string(),
            next_sort_hack: 0,
            dirty: false,
            generation: 0,
        }
    }

    pub fn sort_method(&self) -> &str {
        &self.sort_method
    }

    /// Changes the ordering and re-sorts every bucket.
    pub fn set_sort_method(&mut self, name: &str) {
        self.sort_method = name.to_string();
        let hashes: Vec<Md5Hash> = self.buckets.keys().copied().collect();
        for hash in hashes {
            self.sort_scores(&hash);
        }
    }

    /// Adds a score and returns its index within the sorted bucket.
    ///
    /// The index is found again by timestamp after sorting; `None` means no
    /// score with that timestamp could be located.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHash` unless `hash` is exactly 32 characters.
    pub fn add_score(&mut self, hash: &str, score: Score) -> Result<Option<usize>> {
        let hash: Md5Hash = hash.parse()?;
        let timestamp = score.timestamp;

        self.add_score_raw(hash, score);
        self.sort_scores(&hash);
        self.touch();

        Ok(self
            .scores(&hash)
            .iter()
            .position(|s| s.timestamp == timestamp))
    }

    /// Appends a score without sorting and re-derives `perfect` for older
    /// scores of the same difficulty.
    ///
    /// Scores written after [`SCORES_MAX_COMBO_VERSION`] know the maximum
    /// possible combo. Once a bucket has one, every score that predates that
    /// field (or lacks it) gets `perfect = combo_max > 0 && combo_max >= max`.
    pub fn add_score_raw(&mut self, hash: Md5Hash, mut score: Score) {
        score.sort_hack = self.next_sort_hack;
        self.next_sort_hack += 1;

        let bucket = self.buckets.entry(hash).or_default();
        bucket.push(score);

        let canonical = bucket
            .iter()
            .find(|s| {
                !s.legacy && s.version > SCORES_MAX_COMBO_VERSION && s.max_possible_combo > 0
            })
            .map(|s| s.max_possible_combo);

        if let Some(max_combo) = canonical {
            let max_combo = max_combo as u32;
            for s in bucket.iter_mut() {
                if s.version <= SCORES_MAX_COMBO_VERSION || s.max_possible_combo < 1 {
                    s.perfect = s.combo_max > 0 && s.combo_max >= max_combo;
                }
            }
        }
    }

    /// Removes the first score of `hash` with exactly `timestamp`.
    pub fn delete_score(&mut self, hash: &Md5Hash, timestamp: u64) -> bool {
        let Some(bucket) = self.buckets.get_mut(hash) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|s| s.timestamp == timestamp) else {
            return false;
        };

        bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(hash);
        }
        self.touch();
        true
    }

    /// Re-orders one bucket with the configured comparator.
    ///
    /// An unknown sort method name leaves the bucket untouched.
    pub fn sort_scores(&mut self, hash: &Md5Hash) {
        let Some(method) = SortMethod::from_name(&self.sort_method) else {
            warn!("Unknown score sort method {:?}", self.sort_method);
            return;
        };
        if let Some(bucket) = self.buckets.get_mut(hash) {
            method.sort(bucket);
        }
    }

    pub fn sort_all(&mut self) {
        self.set_sort_method(&self.sort_method.clone());
    }

    pub fn scores(&self, hash: &Md5Hash) -> &[Score] {
        self.buckets.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Md5Hash, &[Score])> {
        self.buckets.iter().map(|(hash, scores)| (hash, scores.as_slice()))
    }

    /// Number of difficulties with at least one score.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn num_scores(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether `score` is already present as an imported copy of a legacy score.
    pub fn contains_imported(&self, hash: &Md5Hash, score: &Score) -> bool {
        self.scores(hash)
            .iter()
            .any(|s| s.imported_legacy && s.same_play(score))
    }

    /// Turns every legacy score into an owned score flagged as imported.
    ///
    /// Legacy scores that already have an imported twin are dropped instead.
    /// Returns how many scores were imported.
    pub fn import_legacy_scores(&mut self) -> usize {
        let mut imported = 0;
        for bucket in self.buckets.values_mut() {
            let mut kept: Vec<Score> = Vec::with_capacity(bucket.len());
            for score in bucket.drain(..) {
                if !score.legacy {
                    kept.push(score);
                    continue;
                }
                if kept.iter().any(|s| s.imported_legacy && s.same_play(&score)) {
                    continue;
                }
                kept.push(Score {
                    legacy: false,
                    imported_legacy: true,
                    ..score
                });
                imported += 1;
            }
            *bucket = kept;
        }

        if imported > 0 {
            debug!("Imported {} legacy scores", imported);
            self.sort_all();
            self.touch();
        }
        imported
    }

    /// Changes whenever the contents change; used to invalidate statistics.
    pub fn stats_generation(&self) -> u64 {
        self.generation
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn hash() -> Md5Hash {
        HASH.parse().unwrap()
    }

    fn score(score: u64, timestamp: u64) -> Score {
        Score {
            score,
            timestamp,
            ..Score::new()
        }
    }

    #[test]
    fn test_add_score_returns_sorted_index() {
        let mut store = ScoreStore::default();
        assert_eq!(store.add_score(HASH, score(100, 1)).unwrap(), Some(0));
        assert_eq!(store.add_score(HASH, score(300, 2)).unwrap(), Some(0));
        assert_eq!(store.add_score(HASH, score(200, 3)).unwrap(), Some(1));

        let order: Vec<u64> = store.scores(&hash()).iter().map(|s| s.score).collect();
        assert_eq!(order, vec![300, 200, 100]);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_add_score_rejects_bad_hash() {
        let mut store = ScoreStore::default();
        assert!(matches!(
            store.add_score("short", score(1, 1)),
            Err(Error::InvalidHash(_))
        ));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_delete_first_timestamp_match() {
        let mut store = ScoreStore::default();
        store.add_score(HASH, score(100, 7)).unwrap();
        store.add_score(HASH, score(200, 8)).unwrap();

        assert!(store.delete_score(&hash(), 7));
        assert!(!store.delete_score(&hash(), 7));
        assert_eq!(store.num_scores(), 1);
        assert_eq!(store.scores(&hash())[0].timestamp, 8);
    }

    #[test]
    fn test_generation_changes_on_mutation() {
        let mut store = ScoreStore::default();
        let before = store.stats_generation();
        store.add_score(HASH, score(1, 1)).unwrap();
        assert_ne!(store.stats_generation(), before);
    }

    #[test]
    fn test_unknown_sort_method_is_noop() {
        let mut store = ScoreStore::new("Sort By Luck");
        store.add_score_raw(hash(), score(100, 1));
        store.add_score_raw(hash(), score(300, 2));
        store.sort_scores(&hash());

        let order: Vec<u64> = store.scores(&hash()).iter().map(|s| s.score).collect();
        assert_eq!(order, vec![100, 300]);
    }

    #[test]
    fn test_set_sort_method_resorts() {
        let mut store = ScoreStore::default();
        store.add_score(HASH, score(100, 20)).unwrap();
        store.add_score(HASH, score(300, 10)).unwrap();

        store.set_sort_method(SortMethod::Date.name());
        assert_eq!(store.scores(&hash())[0].timestamp, 20);
    }

    #[test]
    fn test_retroactive_perfect() {
        let mut store = ScoreStore::default();
        let old = Score {
            version: 20170101,
            combo_max: 500,
            perfect: false,
            ..score(100, 1)
        };
        store.add_score(HASH, old).unwrap();
        assert!(!store.scores(&hash())[0].perfect);

        let new = Score {
            version: 20240412,
            combo_max: 500,
            max_possible_combo: 500,
            perfect: true,
            ..score(200, 2)
        };
        store.add_score(HASH, new).unwrap();

        let old = store.scores(&hash()).iter().find(|s| s.timestamp == 1).unwrap();
        assert!(old.perfect);
    }

    #[test]
    fn test_retroactive_perfect_clears_short_combo() {
        let mut store = ScoreStore::default();
        let old = Score {
            version: 20170101,
            combo_max: 499,
            perfect: true,
            ..score(100, 1)
        };
        store.add_score(HASH, old).unwrap();
        let new = Score {
            version: 20240412,
            combo_max: 10,
            max_possible_combo: 500,
            ..score(200, 2)
        };
        store.add_score(HASH, new).unwrap();

        let old = store.scores(&hash()).iter().find(|s| s.timestamp == 1).unwrap();
        assert!(!old.perfect);
    }

    #[test]
    fn test_import_legacy_scores() {
        let mut store = ScoreStore::default();
        let legacy = Score {
            legacy: true,
            ..score(100, 1)
        };
        store.add_score_raw(hash(), legacy.clone());
        store.add_score_raw(hash(), legacy);

        assert_eq!(store.import_legacy_scores(), 1);
        let scores = store.scores(&hash());
        assert_eq!(scores.len(), 1);
        assert!(!scores[0].legacy);
        assert!(scores[0].imported_legacy);

        // Nothing left to import
        assert_eq!(store.import_legacy_scores(), 0);
    }
}
