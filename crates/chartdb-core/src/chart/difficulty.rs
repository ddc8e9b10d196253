use std::path::PathBuf;

use serde::Serialize;

use crate::hash::Md5Hash;

use super::bpm::BpmInfo;

/// The four core gameplay parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DifficultyStats {
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
}

/// A timing point as stored by the external database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimingPoint {
    /// Milliseconds per beat; negative for inherited points.
    pub beat_length: f64,
    pub offset: f64,
    pub uninherited: bool,
}

/// One playable variant of a chart.
///
/// Everything except the star rating and the BPM summary is fixed once the
/// loader has built the record.
#[derive(Debug, Clone, Serialize)]
pub struct Difficulty {
    pub hash: Md5Hash,
    pub id: i32,
    /// Set id as parsed (or recovered from the folder name); `< 1` if unknown.
    pub set_id: i32,
    pub game_mode: u8,

    pub title: String,
    pub title_unicode: String,
    pub artist: String,
    pub artist_unicode: String,
    pub creator: String,
    pub difficulty_name: String,
    pub source: String,
    pub tags: String,
    pub audio_file: String,

    pub stats: DifficultyStats,
    pub slider_multiplier: f64,
    pub num_circles: u32,
    pub num_sliders: u32,
    pub num_spinners: u32,

    pub length_ms: u32,
    pub preview_ms: i32,
    pub last_modified: i64,

    pub folder: PathBuf,
    pub file_path: PathBuf,

    pub timing_points: Vec<TimingPoint>,
    bpm: BpmInfo,
    stars: f32,
}

impl Difficulty {
    pub fn new(hash: Md5Hash) -> Self {
        Self {
            hash,
            id: 0,
            set_id: -1,
            game_mode: 0,
            title: String::new(),
            title_unicode: String::new(),
            artist: String::new(),
            artist_unicode: String::new(),
            creator: String::new(),
            difficulty_name: String::new(),
            source: String::new(),
            tags: String::new(),
            audio_file: String::new(),
            stats: DifficultyStats::default(),
            slider_multiplier: 0.0,
            num_circles: 0,
            num_sliders: 0,
            num_spinners: 0,
            length_ms: 0,
            preview_ms: -1,
            last_modified: 0,
            folder: PathBuf::new(),
            file_path: PathBuf::new(),
            timing_points: Vec::new(),
            bpm: BpmInfo::default(),
            stars: 0.0,
        }
    }

    pub fn num_objects(&self) -> u32 {
        self.num_circles + self.num_sliders + self.num_spinners
    }

    pub fn stars(&self) -> f32 {
        self.stars
    }

    pub fn set_stars(&mut self, stars: f32) {
        self.stars = stars;
    }

    pub fn bpm(&self) -> BpmInfo {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: BpmInfo) {
        self.bpm = bpm;
    }

    /// Recomputes the BPM summary from the stored timing points.
    pub fn refresh_bpm(&mut self) {
        self.bpm = BpmInfo::from_timing_points(&self.timing_points, f64::from(self.length_ms));
    }

    /// Title + artist + creator, concatenated verbatim.
    ///
    /// Used to group difficulties without a trusted set id. There is no
    /// delimiter and no normalization, so e.g. `("ab", "c")` and `("a", "bc")`
    /// collide; kept as-is for compatibility.
    pub fn composite_key(&self) -> String {
        format!("{}{}{}", self.title, self.artist, self.creator)
    }
}
