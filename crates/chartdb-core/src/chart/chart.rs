use std::path::Path;

use serde::Serialize;

use crate::hash::Md5Hash;

use super::difficulty::Difficulty;

/// Stable identifier of a chart within one loaded library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChartId(pub u32);

/// What a chart was aggregated by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ChartKey {
    /// Trusted numeric set id from the external database.
    SetId(i32),
    /// Title + artist + creator, for difficulties without a usable set id.
    Composite(String),
    /// One folder of a raw filesystem scan.
    Folder(String),
}

/// A playable music item owning one or more difficulties.
#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    id: ChartId,
    key: ChartKey,
    difficulties: Vec<Difficulty>,
}

impl Chart {
    pub(crate) fn new(id: ChartId, key: ChartKey, difficulties: Vec<Difficulty>) -> Self {
        Self {
            id,
            key,
            difficulties,
        }
    }

    pub fn id(&self) -> ChartId {
        self.id
    }

    pub fn key(&self) -> &ChartKey {
        &self.key
    }

    pub fn difficulties(&self) -> &[Difficulty] {
        &self.difficulties
    }

    pub fn difficulty(&self, hash: &Md5Hash) -> Option<&Difficulty> {
        self.difficulties.iter().find(|d| d.hash == *hash)
    }

    /// Set id of the chart, or `-1` if it was grouped by anything else.
    pub fn set_id(&self) -> i32 {
        match self.key {
            ChartKey::SetId(id) => id,
            _ => self
                .difficulties
                .first()
                .map(|d| d.set_id)
                .filter(|&id| id > 0)
                .unwrap_or(-1),
        }
    }

    pub fn title(&self) -> &str {
        self.first_field(|d| &d.title)
    }

    pub fn artist(&self) -> &str {
        self.first_field(|d| &d.artist)
    }

    pub fn creator(&self) -> &str {
        self.first_field(|d| &d.creator)
    }

    pub fn folder(&self) -> Option<&Path> {
        self.difficulties.first().map(|d| d.folder.as_path())
    }

    fn first_field(&self, f: impl Fn(&Difficulty) -> &String) -> &str {
        self.difficulties.first().map(|d| f(d).as_str()).unwrap_or("")
    }

    pub(crate) fn push(&mut self, difficulty: Difficulty) -> usize {
        self.difficulties.push(difficulty);
        self.difficulties.len() - 1
    }

    pub(crate) fn difficulty_at_mut(&mut self, index: usize) -> Option<&mut Difficulty> {
        self.difficulties.get_mut(index)
    }
}
