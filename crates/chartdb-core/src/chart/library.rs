//! The loaded set of charts plus the hash index over their difficulties.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::warn;

use crate::hash::Md5Hash;

use super::chart::{Chart, ChartId, ChartKey};
use super::difficulty::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    chart: usize,
    difficulty: usize,
}

/// Charts owned by one load pass, indexed by difficulty hash.
///
/// A library is built in full and then swapped in as a whole; it is never
/// shared half-built.
#[derive(Debug, Clone, Default)]
pub struct ChartLibrary {
    charts: Vec<Chart>,
    index: HashMap<Md5Hash, Location>,
    positions: HashMap<ChartId, usize>,
    next_id: u32,
}

impl ChartLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn num_difficulties(&self) -> usize {
        self.index.len()
    }

    pub fn chart(&self, hash: &Md5Hash) -> Option<&Chart> {
        self.index.get(hash).map(|loc| &self.charts[loc.chart])
    }

    pub fn chart_by_id(&self, id: ChartId) -> Option<&Chart> {
        self.positions.get(&id).map(|&pos| &self.charts[pos])
    }

    pub fn difficulty(&self, hash: &Md5Hash) -> Option<&Difficulty> {
        self.index
            .get(hash)
            .and_then(|loc| self.charts[loc.chart].difficulties().get(loc.difficulty))
    }

    pub fn contains(&self, hash: &Md5Hash) -> bool {
        self.index.contains_key(hash)
    }

    /// Creates a chart from `difficulties` and registers their hashes.
    ///
    /// Returns the position of the new chart.
    pub fn add_chart(&mut self, key: ChartKey, difficulties: Vec<Difficulty>) -> usize {
        let id = ChartId(self.next_id);
        self.next_id += 1;

        let pos = self.charts.len();
        self.charts.push(Chart::new(id, key, Vec::new()));
        self.positions.insert(id, pos);
        for difficulty in difficulties {
            self.push_difficulty(pos, difficulty);
        }
        pos
    }

    /// Appends a difficulty to the chart at `pos`.
    pub fn push_difficulty(&mut self, pos: usize, difficulty: Difficulty) {
        let hash = difficulty.hash;
        let Some(chart) = self.charts.get_mut(pos) else {
            return;
        };

        match self.index.entry(hash) {
            Entry::Vacant(e) => {
                let index = chart.push(difficulty);
                e.insert(Location {
                    chart: pos,
                    difficulty: index,
                });
            }
            Entry::Occupied(_) => {
                warn!("Duplicate difficulty hash {}, keeping first occurrence", hash);
            }
        }
    }

    pub fn set_stars(&mut self, hash: &Md5Hash, stars: f32) -> bool {
        let Some(loc) = self.index.get(hash).copied() else {
            return false;
        };
        match self.charts[loc.chart].difficulty_at_mut(loc.difficulty) {
            Some(difficulty) => {
                difficulty.set_stars(stars);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> Md5Hash {
        Md5Hash::parse(&format!("{:032x}", n)).unwrap()
    }

    #[test]
    fn test_lookup_by_hash() {
        let mut lib = ChartLibrary::new();
        let pos = lib.add_chart(
            ChartKey::SetId(5),
            vec![Difficulty::new(hash(1)), Difficulty::new(hash(2))],
        );

        assert_eq!(pos, 0);
        assert_eq!(lib.num_difficulties(), 2);
        let chart = lib.chart(&hash(2)).unwrap();
        assert!(chart.difficulty(&hash(2)).is_some());
        assert_eq!(lib.difficulty(&hash(1)).unwrap().hash, hash(1));
        assert!(lib.chart(&hash(3)).is_none());
    }

    #[test]
    fn test_chart_ids_are_sequential() {
        let mut lib = ChartLibrary::new();
        lib.add_chart(ChartKey::SetId(1), vec![Difficulty::new(hash(1))]);
        lib.add_chart(ChartKey::SetId(2), vec![Difficulty::new(hash(2))]);

        let second = lib.chart(&hash(2)).unwrap();
        assert_eq!(second.id(), ChartId(1));
        assert_eq!(lib.chart_by_id(ChartId(1)).unwrap().set_id(), 2);
    }

    #[test]
    fn test_set_stars() {
        let mut lib = ChartLibrary::new();
        lib.add_chart(ChartKey::SetId(1), vec![Difficulty::new(hash(1))]);

        assert!(lib.set_stars(&hash(1), 4.5));
        assert_eq!(lib.difficulty(&hash(1)).unwrap().stars(), 4.5);
        assert!(!lib.set_stars(&hash(9), 1.0));
    }

    #[test]
    fn test_duplicate_hash_keeps_first_difficulty() {
        let mut lib = ChartLibrary::new();
        let mut first = Difficulty::new(hash(1));
        first.difficulty_name = "Hard".to_string();
        let mut second = Difficulty::new(hash(1));
        second.difficulty_name = "Copy".to_string();
        lib.add_chart(ChartKey::SetId(1), vec![first, second]);

        let chart = lib.chart(&hash(1)).unwrap();
        assert_eq!(chart.difficulties().len(), 1);
        assert_eq!(chart.difficulties()[0].difficulty_name, "Hard");
        assert_eq!(lib.num_difficulties(), 1);
    }
}
