//! Parser for the external application's chart database.
//!
//! The file is a header followed by one record per difficulty. Records are
//! parsed in full to keep the cursor aligned, but only those of the configured
//! game mode become [`Difficulty`] values.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::chart::{Difficulty, DifficultyStats, TimingPoint};
use crate::codec::{BinaryFile, ByteBuffer};
use crate::config::DatabaseConfig;
use crate::config::versions::{
    DB_FLOAT_STARS, DB_MIN_SUPPORTED_VERSION, DB_MIN_VERSION, DB_SIZE_PREFIX_REMOVED,
};
use crate::error::{Error, Result};
use crate::hash::Md5Hash;
use crate::storage::StarsCache;

use super::Progress;

/// Number of per-mode star rating blocks in every record.
const RATING_BLOCKS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ExternalDatabase {
    pub version: i32,
    pub folder_count: i32,
    pub player_name: String,
    pub difficulties: Vec<Difficulty>,
    /// Records dropped for missing text fields or a malformed hash.
    pub skipped_corrupt: usize,
}

#[derive(Debug)]
pub enum Outcome {
    Parsed(ExternalDatabase),
    /// The file is newer than the configured ceiling; scan the songs folder
    /// instead.
    Fallback { version: i32 },
}

/// Reads and parses the database at `path`.
///
/// # Errors
///
/// `NotReady` if the file cannot be read, `VersionTooOld` for layouts below
/// the supported floor, `Cancelled` if `cancel` fires mid-parse, or a codec
/// error if the header itself is truncated.
pub fn load_external_db<P: AsRef<Path>>(
    path: P,
    config: &DatabaseConfig,
    stars: &StarsCache,
    cancel: &CancelToken,
    progress: &Progress,
) -> Result<Outcome> {
    let file = BinaryFile::open(path)?;
    let outcome = parse_external_db(file.bytes(), config, stars, cancel, progress)?;
    if let Outcome::Parsed(db) = &outcome {
        info!(
            "Parsed {} difficulties from {:?} (version {}, {} corrupt)",
            db.difficulties.len(),
            file.path(),
            db.version,
            db.skipped_corrupt
        );
    }
    Ok(outcome)
}

pub fn parse_external_db(
    data: &[u8],
    config: &DatabaseConfig,
    stars: &StarsCache,
    cancel: &CancelToken,
    progress: &Progress,
) -> Result<Outcome> {
    let mut buf = ByteBuffer::new(data);

    let version = buf.read_i32()?;
    let folder_count = buf.read_i32()?;
    buf.skip(1 + 8)?; // account unlocked + unlock date
    let player_name = buf.read_osu_string()?;
    let count = buf.read_i32()?;

    check_version(version, config)?;
    if version > config.max_supported_version {
        if config.ignore_version_ceiling {
            warn!(
                "Database version {} is newer than {}, parsing anyway",
                version, config.max_supported_version
            );
        } else {
            warn!(
                "Database version {} is newer than {}, falling back to a raw scan",
                version, config.max_supported_version
            );
            return Ok(Outcome::Fallback { version });
        }
    }

    let songs = config.songs_path();
    let total = count.max(0) as usize;
    let mut db = ExternalDatabase {
        version,
        folder_count,
        player_name,
        difficulties: Vec::with_capacity(total.min(1 << 16)),
        skipped_corrupt: 0,
    };

    for i in 0..total {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let record = read_record(&mut buf, version, config.game_mode)?;
        progress.set((i + 1) as f32 / total as f32);

        if record.mode != config.game_mode {
            continue;
        }
        match record.into_difficulty(&songs, config, stars) {
            Some(difficulty) => db.difficulties.push(difficulty),
            None => db.skipped_corrupt += 1,
        }
    }

    Ok(Outcome::Parsed(db))
}

fn check_version(version: i32, config: &DatabaseConfig) -> Result<()> {
    let minimum = if version < DB_MIN_VERSION {
        DB_MIN_VERSION
    } else {
        DB_MIN_SUPPORTED_VERSION
    };
    if version < minimum {
        warn!("Database version {} is too old (minimum {})", version, minimum);
        return Err(Error::VersionTooOld { version, minimum });
    }
    debug!(
        "Database version {} (ceiling {})",
        version, config.max_supported_version
    );
    Ok(())
}

/// One database record, before it is turned into a [`Difficulty`].
#[derive(Debug, Default)]
struct Record {
    artist: String,
    artist_unicode: String,
    title: String,
    title_unicode: String,
    creator: String,
    difficulty_name: String,
    audio_file: String,
    hash: String,
    osu_file: String,
    num_circles: u32,
    num_sliders: u32,
    num_spinners: u32,
    last_modified: i64,
    stats: DifficultyStats,
    slider_multiplier: f64,
    stars: f32,
    length_ms: u32,
    preview_ms: i32,
    timing_points: Vec<TimingPoint>,
    id: i32,
    set_id: i32,
    mode: u8,
    source: String,
    tags: String,
    folder: String,
}

fn read_record(buf: &mut ByteBuffer<'_>, version: i32, game_mode: u8) -> Result<Record> {
    let mut r = Record::default();

    if version < DB_SIZE_PREFIX_REMOVED {
        buf.skip(4)?;
    }

    r.artist = buf.read_osu_string()?;
    r.artist_unicode = buf.read_osu_string()?;
    r.title = buf.read_osu_string()?;
    r.title_unicode = buf.read_osu_string()?;
    r.creator = buf.read_osu_string()?;
    r.difficulty_name = buf.read_osu_string()?;
    r.audio_file = buf.read_osu_string()?;
    r.hash = buf.read_osu_string()?;
    r.osu_file = buf.read_osu_string()?;

    buf.skip(1)?; // ranked status
    r.num_circles = u32::from(buf.read_u16()?);
    r.num_sliders = u32::from(buf.read_u16()?);
    r.num_spinners = u32::from(buf.read_u16()?);
    r.last_modified = buf.read_i64()?;

    r.stats = DifficultyStats {
        ar: buf.read_f32()?,
        cs: buf.read_f32()?,
        hp: buf.read_f32()?,
        od: buf.read_f32()?,
    };
    r.slider_multiplier = buf.read_f64()?;

    for block in 0..RATING_BLOCKS {
        let count = buf.read_i32()?;
        for _ in 0..count.max(0) {
            buf.skip(1)?; // int marker
            let mods = buf.read_i32()?;
            buf.skip(1)?; // float/double marker
            let rating = if version >= DB_FLOAT_STARS {
                buf.read_f32()?
            } else {
                buf.read_f64()? as f32
            };
            if block == usize::from(game_mode) && mods == 0 {
                r.stars = rating;
            }
        }
    }

    buf.skip(4)?; // drain time, seconds
    r.length_ms = buf.read_i32()?.max(0) as u32;
    r.preview_ms = buf.read_i32()?;

    let num_points = buf.read_i32()?;
    r.timing_points.reserve(num_points.clamp(0, 4096) as usize);
    for _ in 0..num_points.max(0) {
        r.timing_points.push(TimingPoint {
            beat_length: buf.read_f64()?,
            offset: buf.read_f64()?,
            uninherited: buf.read_bool()?,
        });
    }

    r.id = buf.read_i32()?;
    r.set_id = buf.read_i32()?;
    buf.skip(4)?; // thread id
    buf.skip(4)?; // grades
    buf.skip(2)?; // local offset
    buf.skip(4)?; // stack leniency
    r.mode = buf.read_u8()?;

    r.source = buf.read_osu_string()?;
    r.tags = buf.read_osu_string()?;
    buf.skip(2)?; // online offset
    buf.skip_osu_string()?; // title font
    buf.skip(1)?; // unplayed
    buf.skip(8)?; // last played
    buf.skip(1)?; // osz2

    r.folder = buf.read_osu_string()?;
    buf.skip(8)?; // last online check
    buf.skip(5)?; // ignore sound/skin, disable storyboard/video, visual override
    buf.skip(4)?; // last edit
    buf.skip(1)?; // mania scroll speed

    Ok(r)
}

impl Record {
    fn is_blank(&self) -> bool {
        self.artist.is_empty()
            && self.title.is_empty()
            && self.creator.is_empty()
            && self.difficulty_name.is_empty()
            && self.hash.is_empty()
    }

    fn into_difficulty(
        self,
        songs: &Path,
        config: &DatabaseConfig,
        stars: &StarsCache,
    ) -> Option<Difficulty> {
        if self.is_blank() {
            warn!("Skipping corrupt database entry with no metadata");
            return None;
        }
        let Some(hash) = Md5Hash::parse(&self.hash) else {
            warn!(
                "Skipping database entry {:?} with invalid hash {:?}",
                self.osu_file, self.hash
            );
            return None;
        };

        let set_id = if self.set_id > 0 {
            self.set_id
        } else {
            set_id_from_folder(&self.folder).unwrap_or(-1)
        };

        let mut d = Difficulty::new(hash);
        d.id = self.id;
        d.set_id = set_id;
        d.game_mode = self.mode;
        d.title = self.title;
        d.title_unicode = self.title_unicode;
        d.artist = self.artist;
        d.artist_unicode = self.artist_unicode;
        d.creator = self.creator;
        d.difficulty_name = self.difficulty_name;
        d.source = self.source;
        d.tags = self.tags;
        d.audio_file = self.audio_file;
        d.stats = self.stats;
        d.slider_multiplier = self.slider_multiplier;
        d.num_circles = self.num_circles;
        d.num_sliders = self.num_sliders;
        d.num_spinners = self.num_spinners;
        d.length_ms = self.length_ms;
        d.preview_ms = self.preview_ms;
        d.last_modified = self.last_modified;
        d.folder = songs.join(&self.folder);
        d.file_path = d.folder.join(&self.osu_file);
        d.timing_points = self.timing_points;
        d.refresh_bpm();

        let rating = if !config.stars_cache_enabled {
            0.0
        } else {
            stars.get(&hash).unwrap_or(self.stars)
        };
        d.set_stars(rating);

        Some(d)
    }
}

/// Leading number of the first path segment, e.g. `"123 Artist - Title"`.
fn set_id_from_folder(folder: &str) -> Option<i32> {
    let first = folder.split(['/', '\\']).next()?;
    let digits: &str = &first[..first
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(first.len())];
    digits.parse::<i32>().ok().filter(|&id| id > 0)
}
