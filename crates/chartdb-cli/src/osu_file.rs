//! Chart-file parsing for raw scans, backed by `rosu-map`.

use std::fs;
use std::path::Path;

use chartdb_core::codec::md5_hex;
use chartdb_core::{Difficulty, DifficultyLoader, DifficultyStats, TimingPoint};
use rosu_map::Beatmap;
use rosu_map::section::general::GameMode;
use rosu_map::section::hit_objects::HitObjectKind;
use tracing::{debug, warn};

/// Builds difficulties from the `.osu` files of a chart folder.
pub struct OsuFileLoader;

impl DifficultyLoader for OsuFileLoader {
    fn load_folder(&self, folder: &Path) -> Vec<Difficulty> {
        let Ok(entries) = fs::read_dir(folder) else {
            warn!("Cannot read chart folder {:?}", folder);
            return Vec::new();
        };

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("osu"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        files
            .iter()
            .filter_map(|path| match load_file(folder, path) {
                Ok(difficulty) => Some(difficulty),
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    None
                }
            })
            .collect()
    }
}

fn load_file(folder: &Path, path: &Path) -> anyhow::Result<Difficulty> {
    let bytes = fs::read(path)?;
    let map = Beatmap::from_bytes(&bytes)?;

    let mut d = Difficulty::new(md5_hex(&bytes));
    d.id = map.beatmap_id;
    d.set_id = map.beatmap_set_id;
    d.game_mode = mode_index(map.mode);
    d.title = map.title;
    d.title_unicode = map.title_unicode;
    d.artist = map.artist;
    d.artist_unicode = map.artist_unicode;
    d.creator = map.creator;
    d.difficulty_name = map.version;
    d.source = map.source;
    d.tags = map.tags;
    d.audio_file = map.audio_file;
    d.preview_ms = map.preview_time;
    d.stats = DifficultyStats {
        ar: map.approach_rate,
        cs: map.circle_size,
        hp: map.hp_drain_rate,
        od: map.overall_difficulty,
    };
    d.slider_multiplier = map.slider_multiplier;

    for hit_object in &map.hit_objects {
        match hit_object.kind {
            HitObjectKind::Circle(_) => d.num_circles += 1,
            HitObjectKind::Slider(_) => d.num_sliders += 1,
            HitObjectKind::Spinner(_) | HitObjectKind::Hold(_) => d.num_spinners += 1,
        }
    }
    d.length_ms = map
        .hit_objects
        .last()
        .map(|h| h.start_time.max(0.0) as u32)
        .unwrap_or(0);

    d.timing_points = map
        .control_points
        .timing_points
        .iter()
        .map(|tp| TimingPoint {
            beat_length: tp.beat_len,
            offset: tp.time,
            uninherited: true,
        })
        .collect();
    d.refresh_bpm();

    d.folder = folder.to_path_buf();
    d.file_path = path.to_path_buf();

    debug!("Parsed {:?} ({} objects)", path, d.num_objects());
    Ok(d)
}

fn mode_index(mode: GameMode) -> u8 {
    match mode {
        GameMode::Osu => 0,
        GameMode::Taiko => 1,
        GameMode::Catch => 2,
        GameMode::Mania => 3,
    }
}
