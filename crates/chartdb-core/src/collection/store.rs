use tracing::debug;

use crate::chart::ChartLibrary;
use crate::error::{Error, Result};
use crate::hash::Md5Hash;

use super::{Collection, CollectionEntry};

/// All collections, kept sorted by case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct CollectionStore {
    collections: Vec<Collection>,
    dirty: bool,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }

    /// Adds `hashes` to the collection `name`, creating it if needed.
    ///
    /// An existing collection of the same name absorbs the hashes it does not
    /// hold yet; a new one takes `legacy` as its provenance. Hashes that do not
    /// resolve to a loaded difficulty are skipped. Returns how many entries
    /// were added.
    pub(crate) fn merge(
        &mut self,
        name: &str,
        legacy: bool,
        hashes: &[Md5Hash],
        library: &ChartLibrary,
    ) -> usize {
        let pos = match self.position(name) {
            Some(pos) => pos,
            None => {
                self.collections.push(Collection::new(name, legacy));
                self.collections.len() - 1
            }
        };

        let collection = &mut self.collections[pos];
        let mut added = 0;
        for &hash in hashes {
            if collection.insert(CollectionEntry { hash, legacy }, library) {
                added += 1;
            }
        }
        added
    }

    /// Creates an empty collection.
    pub fn add_collection(&mut self, name: &str) -> Result<()> {
        if self.position(name).is_some() {
            return Err(Error::CollectionExists(name.to_string()));
        }
        self.collections.push(Collection::new(name, false));
        self.touch();
        Ok(())
    }

    pub fn rename_collection(&mut self, old: &str, new: &str) -> Result<()> {
        let pos = self.require(old)?;
        if self.collections[pos].is_legacy() {
            return Err(Error::LegacyProvenance(format!(
                "collection {:?} cannot be renamed",
                old
            )));
        }
        if old != new && self.position(new).is_some() {
            return Err(Error::CollectionExists(new.to_string()));
        }

        self.collections[pos].set_name(new.to_string());
        self.touch();
        Ok(())
    }

    pub fn delete_collection(&mut self, name: &str) -> Result<()> {
        let pos = self.require(name)?;
        if self.collections[pos].is_legacy() {
            return Err(Error::LegacyProvenance(format!(
                "collection {:?} cannot be deleted",
                name
            )));
        }

        self.collections.remove(pos);
        self.touch();
        Ok(())
    }

    /// Adds a difficulty to a collection. Legacy collections accept new
    /// entries; those entries are ours and get saved.
    ///
    /// Returns `false` if the difficulty was already a member.
    pub fn add_difficulty(
        &mut self,
        collection: &str,
        hash: &Md5Hash,
        library: &ChartLibrary,
    ) -> Result<bool> {
        let pos = self.require(collection)?;
        if !library.contains(hash) {
            return Err(Error::DifficultyNotFound(hash.to_string()));
        }

        let entry = CollectionEntry {
            hash: *hash,
            legacy: false,
        };
        if !self.collections[pos].insert(entry, library) {
            return Ok(false);
        }
        self.touch();
        Ok(true)
    }

    /// Removes a difficulty we added ourselves.
    ///
    /// Returns `false` if the difficulty was not a member.
    pub fn remove_difficulty(&mut self, collection: &str, hash: &Md5Hash) -> Result<bool> {
        let pos = self.require(collection)?;
        match self.collections[pos].entry(hash) {
            None => return Ok(false),
            Some(entry) if entry.legacy => {
                return Err(Error::LegacyProvenance(format!(
                    "{} is a legacy entry of {:?}",
                    hash, collection
                )));
            }
            Some(_) => {}
        }

        self.collections[pos].remove(hash);
        self.touch();
        Ok(true)
    }

    /// Rebuilds every derived chart view after the library was replaced.
    pub fn rebuild_views(&mut self, library: &ChartLibrary) {
        for collection in &mut self.collections {
            collection.rebuild_view(library);
        }
    }

    /// Orders collections by name, ignoring case.
    pub fn sort(&mut self) {
        self.collections.sort_by_cached_key(|c| c.name().to_lowercase());
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.collections.iter().position(|c| c.name() == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    fn touch(&mut self) {
        self.sort();
        self.dirty = true;
        debug!("Collections changed ({} total)", self.collections.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartKey, Difficulty};

    fn hash(n: u8) -> Md5Hash {
        Md5Hash::parse(&format!("{:032x}", n)).unwrap()
    }

    fn library() -> ChartLibrary {
        let mut library = ChartLibrary::new();
        library.add_chart(
            ChartKey::SetId(1),
            vec![Difficulty::new(hash(1)), Difficulty::new(hash(2))],
        );
        library.add_chart(ChartKey::SetId(2), vec![Difficulty::new(hash(3))]);
        library
    }

    #[test]
    fn test_merge_by_name_keeps_provenance() {
        let library = library();
        let mut store = CollectionStore::new();

        store.merge("Favorites", true, &[hash(2)], &library);
        store.merge("Favorites", false, &[hash(1), hash(2)], &library);

        assert_eq!(store.len(), 1);
        let favorites = store.get("Favorites").unwrap();
        assert!(favorites.is_legacy());
        assert_eq!(favorites.len(), 2);
        assert!(favorites.entry(&hash(2)).unwrap().legacy);
        assert!(!favorites.entry(&hash(1)).unwrap().legacy);

        // Both difficulties belong to the same chart
        assert_eq!(favorites.charts().len(), 1);
        assert_eq!(favorites.charts()[0].difficulties.len(), 2);
    }

    #[test]
    fn test_merge_skips_unknown_hashes() {
        let library = library();
        let mut store = CollectionStore::new();
        assert_eq!(store.merge("A", false, &[hash(1), hash(99)], &library), 1);
    }

    #[test]
    fn test_sorted_case_insensitive() {
        let mut store = CollectionStore::new();
        store.add_collection("beta").unwrap();
        store.add_collection("Alpha").unwrap();
        store.add_collection("gamma").unwrap();

        let names: Vec<&str> = store.collections().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = CollectionStore::new();
        store.add_collection("A").unwrap();
        assert!(matches!(
            store.add_collection("A"),
            Err(Error::CollectionExists(_))
        ));
    }

    #[test]
    fn test_legacy_collection_protected() {
        let library = library();
        let mut store = CollectionStore::new();
        store.merge("Old", true, &[hash(1)], &library);

        assert!(matches!(
            store.rename_collection("Old", "New"),
            Err(Error::LegacyProvenance(_))
        ));
        assert!(matches!(
            store.delete_collection("Old"),
            Err(Error::LegacyProvenance(_))
        ));
        assert!(matches!(
            store.remove_difficulty("Old", &hash(1)),
            Err(Error::LegacyProvenance(_))
        ));

        // Our own entries inside it can come and go
        assert!(store.add_difficulty("Old", &hash(3), &library).unwrap());
        assert!(store.remove_difficulty("Old", &hash(3)).unwrap());
        assert!(!store.is_empty());
    }

    #[test]
    fn test_rename_and_delete() {
        let library = library();
        let mut store = CollectionStore::new();
        store.add_collection("Mine").unwrap();
        store.add_difficulty("Mine", &hash(3), &library).unwrap();

        store.rename_collection("Mine", "Ours").unwrap();
        assert!(store.get("Mine").is_none());
        assert_eq!(store.get("Ours").unwrap().len(), 1);

        store.delete_collection("Ours").unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.delete_collection("Ours"),
            Err(Error::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_add_unknown_difficulty() {
        let library = library();
        let mut store = CollectionStore::new();
        store.add_collection("Mine").unwrap();
        assert!(matches!(
            store.add_difficulty("Mine", &hash(42), &library),
            Err(Error::DifficultyNotFound(_))
        ));
        assert!(store.add_difficulty("Mine", &hash(1), &library).unwrap());
        assert!(!store.add_difficulty("Mine", &hash(1), &library).unwrap());
    }
}
