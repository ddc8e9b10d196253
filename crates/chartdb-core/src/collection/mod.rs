//! User-curated, named groups of difficulties.
//!
//! Collections come from two files: the external application's (legacy) and
//! our own. Both are merged by name. Every collection and every entry remembers
//! whether it came from the legacy file; legacy data is never written back and
//! cannot be renamed, deleted or removed.

mod store;

use serde::Serialize;

use crate::chart::{ChartId, ChartLibrary};
use crate::hash::Md5Hash;

pub use store::CollectionStore;

/// One difficulty reference inside a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionEntry {
    pub hash: Md5Hash,
    pub legacy: bool,
}

/// A chart in a collection's derived view, with the member difficulties it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionChart {
    pub chart: ChartId,
    pub difficulties: Vec<Md5Hash>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    name: String,
    legacy: bool,
    entries: Vec<CollectionEntry>,
    /// Rebuilt from `entries`; never persisted.
    view: Vec<CollectionChart>,
}

impl Collection {
    pub fn new(name: impl Into<String>, legacy: bool) -> Self {
        Self {
            name: name.into(),
            legacy,
            entries: Vec::new(),
            view: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the collection was first created from the legacy file.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    pub fn charts(&self) -> &[CollectionChart] {
        &self.view
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: &Md5Hash) -> bool {
        self.entries.iter().any(|e| e.hash == *hash)
    }

    pub fn entry(&self, hash: &Md5Hash) -> Option<&CollectionEntry> {
        self.entries.iter().find(|e| e.hash == *hash)
    }

    /// Whether anything in this collection belongs in our own file.
    pub fn has_custom_data(&self) -> bool {
        !self.legacy || self.entries.iter().any(|e| !e.legacy)
    }

    /// Appends `entry` unless its hash is already present or unknown.
    ///
    /// Returns whether the entry was added.
    pub(crate) fn insert(&mut self, entry: CollectionEntry, library: &ChartLibrary) -> bool {
        if self.contains(&entry.hash) {
            return false;
        }
        let Some(chart) = library.chart(&entry.hash) else {
            return false;
        };

        let chart = chart.id();
        self.entries.push(entry);
        self.add_to_view(chart, entry.hash);
        true
    }

    pub(crate) fn remove(&mut self, hash: &Md5Hash) -> Option<CollectionEntry> {
        let pos = self.entries.iter().position(|e| e.hash == *hash)?;
        let entry = self.entries.remove(pos);

        for view in &mut self.view {
            view.difficulties.retain(|h| h != hash);
        }
        self.view.retain(|c| !c.difficulties.is_empty());
        Some(entry)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Recomputes the chart view against `library`, dropping unknown hashes
    /// from the view but keeping them as entries.
    pub fn rebuild_view(&mut self, library: &ChartLibrary) {
        self.view.clear();
        let resolved: Vec<(ChartId, Md5Hash)> = self
            .entries
            .iter()
            .filter_map(|e| library.chart(&e.hash).map(|c| (c.id(), e.hash)))
            .collect();
        for (chart, hash) in resolved {
            self.add_to_view(chart, hash);
        }
    }

    fn add_to_view(&mut self, chart: ChartId, hash: Md5Hash) {
        match self.view.iter_mut().find(|c| c.chart == chart) {
            Some(view) => view.difficulties.push(hash),
            None => self.view.push(CollectionChart {
                chart,
                difficulties: vec![hash],
            }),
        }
    }
}
