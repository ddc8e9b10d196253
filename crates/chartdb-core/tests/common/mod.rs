//! Fixture writers shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chartdb_core::codec::ByteWriter;
use chartdb_core::config::versions::{DB_FLOAT_STARS, DB_SIZE_PREFIX_REMOVED};
use chartdb_core::{DatabaseConfig, Difficulty, DifficultyLoader, Md5Hash};

pub fn hash(n: u8) -> Md5Hash {
    Md5Hash::parse(&format!("{:032x}", n)).unwrap()
}

/// Config rooted in a temporary folder, with our own files under `data/`.
pub fn config_in(dir: &Path) -> DatabaseConfig {
    DatabaseConfig {
        osu_folder: dir.to_path_buf(),
        data_folder: dir.join("data"),
        ..DatabaseConfig::default()
    }
}

/// One record of the external database.
#[derive(Debug, Clone)]
pub struct DbEntry {
    pub hash: Md5Hash,
    pub set_id: i32,
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub folder: String,
    pub stars: f64,
}

impl DbEntry {
    pub fn new(n: u8, set_id: i32) -> Self {
        Self {
            hash: hash(n),
            set_id,
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            creator: "Mapper".to_string(),
            folder: format!("{} Artist - Title", set_id.max(0)),
            stars: 4.0,
        }
    }

    pub fn untrusted(n: u8, title: &str, artist: &str, creator: &str) -> Self {
        Self {
            set_id: -1,
            title: title.to_string(),
            artist: artist.to_string(),
            creator: creator.to_string(),
            folder: format!("unknown {}", n),
            ..Self::new(n, -1)
        }
    }
}

pub fn write_external_db(path: &Path, version: i32, entries: &[DbEntry]) {
    let mut w = ByteWriter::new();
    w.write_i32(version);
    w.write_i32(entries.len() as i32);
    w.write_bool(true);
    w.write_i64(0);
    w.write_osu_string("player");
    w.write_i32(entries.len() as i32);

    for e in entries {
        if version < DB_SIZE_PREFIX_REMOVED {
            w.write_i32(0);
        }
        w.write_osu_string(&e.artist);
        w.write_osu_string("");
        w.write_osu_string(&e.title);
        w.write_osu_string("");
        w.write_osu_string(&e.creator);
        w.write_osu_string(&format!("Diff {}", e.hash));
        w.write_osu_string("audio.mp3");
        w.write_osu_string(e.hash.as_str());
        w.write_osu_string(&format!("{}.osu", e.hash));
        w.write_u8(4);
        w.write_u16(300);
        w.write_u16(50);
        w.write_u16(2);
        w.write_i64(0);
        for stat in [9.0f32, 4.0, 5.0, 8.0] {
            w.write_f32(stat);
        }
        w.write_f64(1.4);
        for _ in 0..4 {
            w.write_i32(1);
            w.write_u8(0x08);
            w.write_i32(0);
            if version >= DB_FLOAT_STARS {
                w.write_u8(0x0c);
                w.write_f32(e.stars as f32);
            } else {
                w.write_u8(0x0d);
                w.write_f64(e.stars);
            }
        }
        w.write_i32(120);
        w.write_i32(120_000);
        w.write_i32(30_000);
        w.write_i32(2);
        w.write_f64(500.0);
        w.write_f64(0.0);
        w.write_bool(true);
        w.write_f64(400.0);
        w.write_f64(90_000.0);
        w.write_bool(true);
        w.write_i32(1);
        w.write_i32(e.set_id);
        w.write_i32(0);
        w.write_bytes(&[9, 9, 9, 9]);
        w.write_i16(0);
        w.write_f32(0.7);
        w.write_u8(0);
        w.write_osu_string("");
        w.write_osu_string("");
        w.write_i16(0);
        w.write_osu_string("");
        w.write_bool(true);
        w.write_i64(0);
        w.write_bool(false);
        w.write_osu_string(&e.folder);
        w.write_i64(0);
        w.write_bytes(&[0, 0, 0, 0, 0]);
        w.write_i32(0);
        w.write_u8(0);
    }

    w.write(path).unwrap();
}

pub fn write_legacy_collections(path: &Path, collections: &[(&str, &[Md5Hash])]) {
    let mut w = ByteWriter::new();
    w.write_i32(20150203);
    w.write_i32(collections.len() as i32);
    for (name, hashes) in collections {
        w.write_osu_string(name);
        w.write_i32(hashes.len() as i32);
        for hash in *hashes {
            w.write_osu_string(hash.as_str());
        }
    }
    w.write(path).unwrap();
}

/// One play in the external application's score file.
#[derive(Debug, Clone)]
pub struct LegacyPlay {
    pub hash: Md5Hash,
    pub player: String,
    pub timestamp: u64,
    pub score: i32,
}

impl LegacyPlay {
    pub fn new(n: u8, timestamp: u64) -> Self {
        Self {
            hash: hash(n),
            player: "alice".to_string(),
            timestamp,
            score: 500_000,
        }
    }
}

/// Writes a legacy score file holding one chart entry per play.
pub fn write_legacy_scores(path: &Path, plays: &[LegacyPlay]) {
    const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
    const TICKS_PER_SECOND: i64 = 10_000_000;
    const VERSION: i32 = 20150203;

    let mut w = ByteWriter::new();
    w.write_i32(VERSION);
    w.write_i32(plays.len() as i32);
    for play in plays {
        w.write_osu_string(play.hash.as_str());
        w.write_i32(1);

        w.write_u8(0);
        w.write_i32(VERSION);
        w.write_osu_string(play.hash.as_str());
        w.write_osu_string(&play.player);
        w.write_osu_string("replay");
        for n in [100u16, 2, 0, 10, 1, 0] {
            w.write_u16(n);
        }
        w.write_i32(play.score);
        w.write_u16(150);
        w.write_bool(false);
        w.write_i32(0);
        w.write_osu_string("");
        w.write_i64(UNIX_EPOCH_TICKS + play.timestamp as i64 * TICKS_PER_SECOND);
        w.write_i32(-1);
        w.write_i64(7);
    }
    w.write(path).unwrap();
}

/// Creates `names` as chart folders, each holding an empty `.osu` file.
pub fn make_song_folders(songs: &Path, names: &[&str]) -> Vec<PathBuf> {
    std::fs::create_dir_all(songs).unwrap();
    names
        .iter()
        .map(|name| {
            let folder = songs.join(name);
            std::fs::create_dir_all(&folder).unwrap();
            std::fs::write(folder.join("chart.osu"), b"").unwrap();
            folder
        })
        .collect()
}

/// One difficulty per folder with a `chart.osu`, hashed by the folder's
/// leading number. Folders named with "mania" hold a mania difficulty.
#[derive(Default)]
pub struct MockLoader {
    pub calls: AtomicUsize,
}

impl MockLoader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DifficultyLoader for MockLoader {
    fn load_folder(&self, folder: &Path) -> Vec<Difficulty> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !folder.join("chart.osu").exists() {
            return Vec::new();
        }
        let name = folder.file_name().unwrap().to_string_lossy().into_owned();
        let n: u8 = name
            .split(' ')
            .next()
            .and_then(|id| id.parse().ok())
            .unwrap_or(0);
        let mut difficulty = Difficulty::new(hash(n));
        if name.contains("mania") {
            difficulty.game_mode = 3;
        }
        difficulty.title = name;
        difficulty.folder = folder.to_path_buf();
        difficulty.file_path = folder.join("chart.osu");
        difficulty.set_stars(3.0);
        vec![difficulty]
    }
}
