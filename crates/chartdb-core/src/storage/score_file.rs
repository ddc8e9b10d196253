//! Score files: our own format (read/write) and the external application's
//! legacy format (read-only).
//!
//! Both share the outer shape `version: i32`, `charts: i32`, then per chart a
//! hash string, `count: i32` and `count` score records. Our format uses
//! `u32`-prefixed strings, the legacy one uses the external string encoding.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::codec::{BinaryFile, ByteBuffer, ByteWriter};
use crate::config::versions::{
    LEGACY_SCORES_ONLINE_ID_I64, SCORES_MAX_COMBO_VERSION, SCORES_PACKED_IMPORT_FLAG,
    SCORES_VERSION,
};
use crate::error::{Error, Result};
use crate::hash::{HASH_LEN, Md5Hash};
use crate::score::{Score, ScoreStore, mods};

/// Mode-byte bit that carried the imported flag in older files.
const PACKED_IMPORT_BIT: u8 = 0x02;

/// .NET ticks at the unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Summary of one score file load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLoadReport {
    pub version: i32,
    pub loaded: usize,
    /// Records dropped for a bad hash, another game mode or an existing import.
    pub skipped: usize,
    /// The stream was cut short by corruption; everything before it was kept.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Custom,
    Legacy,
}

/// Loads our own score file into `store`.
///
/// # Errors
///
/// `NotReady` if the file cannot be read, `VersionTooNew` if it was written
/// by a newer build. Neither adds anything to the store.
pub fn load_scores<P: AsRef<Path>>(
    path: P,
    store: &mut ScoreStore,
    game_mode: u8,
) -> Result<ScoreLoadReport> {
    let file = BinaryFile::open(path)?;
    let report = parse_scores(file.bytes(), Dialect::Custom, store, game_mode)?;
    info!(
        "Loaded {} scores from {:?} (version {})",
        report.loaded,
        file.path(),
        report.version
    );
    Ok(report)
}

/// Loads the external application's score file into `store`, after our own.
///
/// Records identical to a score we already imported are dropped. If
/// `custom_path` has the same size the data folder most likely points at the
/// external installation, and the legacy file is skipped entirely.
pub fn load_legacy_scores<P: AsRef<Path>>(
    path: P,
    custom_path: Option<&Path>,
    store: &mut ScoreStore,
    game_mode: u8,
) -> Result<ScoreLoadReport> {
    let file = BinaryFile::open(path)?;
    if let Some(custom_path) = custom_path {
        if let Ok(meta) = std::fs::metadata(custom_path) {
            if meta.len() == file.len() as u64 {
                warn!(
                    "{:?} has the same size as {:?}, skipping legacy scores",
                    file.path(),
                    custom_path
                );
                return Ok(ScoreLoadReport::default());
            }
        }
    }

    let report = parse_scores(file.bytes(), Dialect::Legacy, store, game_mode)?;
    info!(
        "Loaded {} legacy scores from {:?} (version {})",
        report.loaded,
        file.path(),
        report.version
    );
    Ok(report)
}

fn parse_scores(
    data: &[u8],
    dialect: Dialect,
    store: &mut ScoreStore,
    game_mode: u8,
) -> Result<ScoreLoadReport> {
    let mut buf = ByteBuffer::new(data);
    let mut report = ScoreLoadReport {
        version: buf.read_i32()?,
        ..ScoreLoadReport::default()
    };

    if dialect == Dialect::Custom && report.version > SCORES_VERSION {
        warn!(
            "Score file version {} is newer than supported {}",
            report.version, SCORES_VERSION
        );
        return Err(Error::VersionTooNew {
            version: report.version,
            maximum: SCORES_VERSION,
        });
    }

    let num_charts = buf.read_i32()?;
    for _ in 0..num_charts.max(0) {
        match parse_chart(&mut buf, dialect, report.version, store, game_mode, &mut report) {
            Ok(()) => {}
            Err(e) => {
                warn!("Score stream corrupted ({}), keeping what was read", e);
                report.truncated = true;
                break;
            }
        }
    }

    Ok(report)
}

fn parse_chart(
    buf: &mut ByteBuffer<'_>,
    dialect: Dialect,
    file_version: i32,
    store: &mut ScoreStore,
    game_mode: u8,
    report: &mut ScoreLoadReport,
) -> Result<()> {
    let raw_hash = match dialect {
        Dialect::Custom => buf.read_std_string()?,
        Dialect::Legacy => buf.read_osu_string()?,
    };
    if raw_hash.len() > HASH_LEN {
        return Err(Error::StreamCorrupted(format!(
            "hash of {} characters",
            raw_hash.len()
        )));
    }
    let hash = Md5Hash::parse(&raw_hash);
    if hash.is_none() {
        warn!("Skipping scores for invalid hash {:?}", raw_hash);
    }

    let count = buf.read_i32()?;
    for _ in 0..count.max(0) {
        let score = match dialect {
            Dialect::Custom => read_custom_score(buf, file_version)?,
            Dialect::Legacy => read_legacy_score(buf)?,
        };

        let Some(hash) = hash else {
            report.skipped += 1;
            continue;
        };
        if score.game_mode != game_mode {
            report.skipped += 1;
            continue;
        }
        if dialect == Dialect::Legacy && store.contains_imported(&hash, &score) {
            debug!("Dropping legacy score already imported for {}", hash);
            report.skipped += 1;
            continue;
        }

        store.add_score_raw(hash, score);
        report.loaded += 1;
    }
    Ok(())
}

fn read_custom_score(buf: &mut ByteBuffer<'_>, file_version: i32) -> Result<Score> {
    let mut score = Score::new();

    let mode = buf.read_u8()?;
    if file_version >= SCORES_VERSION {
        score.game_mode = mode;
        score.imported_legacy = buf.read_bool()?;
    } else if file_version >= SCORES_PACKED_IMPORT_FLAG {
        score.game_mode = mode & !PACKED_IMPORT_BIT;
        score.imported_legacy = mode & PACKED_IMPORT_BIT != 0;
    } else {
        score.game_mode = mode;
    }

    score.version = buf.read_i32()?;
    score.timestamp = buf.read_i64()?.max(0) as u64;
    score.player_name = buf.read_std_string()?;

    score.num300 = u32::from(buf.read_u16()?);
    score.num100 = u32::from(buf.read_u16()?);
    score.num50 = u32::from(buf.read_u16()?);
    score.num_gekis = u32::from(buf.read_u16()?);
    score.num_katus = u32::from(buf.read_u16()?);
    score.num_misses = u32::from(buf.read_u16()?);

    score.score = buf.read_i64()?.max(0) as u64;
    score.combo_max = u32::from(buf.read_u16()?);
    score.mods = buf.read_i32()? as u32;

    score.num_slider_breaks = u32::from(buf.read_u16()?);
    score.pp = buf.read_f32()?;
    score.unstable_rate = buf.read_f32()?;
    score.hit_error_avg_min = buf.read_f32()?;
    score.hit_error_avg_max = buf.read_f32()?;
    score.stars_total = buf.read_f32()?;
    score.stars_aim = buf.read_f32()?;
    score.stars_speed = buf.read_f32()?;
    score.speed_multiplier = buf.read_f32()?;
    score.cs = buf.read_f32()?;
    score.ar = buf.read_f32()?;
    score.od = buf.read_f32()?;
    score.hp = buf.read_f32()?;

    if score.version > SCORES_MAX_COMBO_VERSION {
        score.max_possible_combo = buf.read_i32()?;
        score.num_hit_objects = buf.read_i32()?;
        score.num_circles = buf.read_i32()?;
        score.perfect = score.max_possible_combo > 0
            && score.combo_max > 0
            && score.combo_max >= score.max_possible_combo as u32;
    }

    score.experimental_mods = buf.read_std_string()?;
    Ok(score)
}

fn read_legacy_score(buf: &mut ByteBuffer<'_>) -> Result<Score> {
    let mut score = Score {
        legacy: true,
        speed_multiplier: 1.0,
        ..Score::default()
    };

    score.game_mode = buf.read_u8()?;
    score.version = buf.read_i32()?;
    buf.skip_osu_string()?; // beatmap hash, same as the chart's
    score.player_name = buf.read_osu_string()?;
    buf.skip_osu_string()?; // replay hash

    score.num300 = u32::from(buf.read_u16()?);
    score.num100 = u32::from(buf.read_u16()?);
    score.num50 = u32::from(buf.read_u16()?);
    score.num_gekis = u32::from(buf.read_u16()?);
    score.num_katus = u32::from(buf.read_u16()?);
    score.num_misses = u32::from(buf.read_u16()?);

    score.score = buf.read_i32()?.max(0) as u64;
    score.combo_max = u32::from(buf.read_u16()?);
    score.perfect = buf.read_bool()?;
    score.mods = buf.read_i32()? as u32;

    buf.skip_osu_string()?; // life bar graph
    score.timestamp = ticks_to_unix(buf.read_i64()?);
    buf.skip(4)?; // always -1

    score.online_score_id = if score.version >= LEGACY_SCORES_ONLINE_ID_I64 {
        buf.read_i64()?
    } else {
        i64::from(buf.read_i32()?)
    };

    if score.has_mods(mods::TARGET_PRACTICE) {
        buf.skip(8)?; // total accuracy
    }
    Ok(score)
}

fn ticks_to_unix(ticks: i64) -> u64 {
    if ticks <= UNIX_EPOCH_TICKS {
        return 0;
    }
    ((ticks - UNIX_EPOCH_TICKS) / TICKS_PER_SECOND) as u64
}

/// Serializes every non-legacy score, buckets ordered by hash.
pub fn encode_scores(store: &ScoreStore) -> ByteWriter {
    let mut buckets: Vec<(&Md5Hash, Vec<&Score>)> = store
        .iter()
        .map(|(hash, scores)| (hash, scores.iter().filter(|s| !s.legacy).collect::<Vec<_>>()))
        .filter(|(_, scores)| !scores.is_empty())
        .collect();
    buckets.sort_by(|a, b| a.0.cmp(b.0));

    let mut w = ByteWriter::new();
    w.write_i32(SCORES_VERSION);
    w.write_i32(buckets.len() as i32);
    for (hash, scores) in buckets {
        w.write_std_string(hash.as_str());
        w.write_i32(scores.len() as i32);
        for score in scores {
            write_custom_score(&mut w, score);
        }
    }
    w
}

fn write_custom_score(w: &mut ByteWriter, score: &Score) {
    w.write_u8(score.game_mode);
    w.write_bool(score.imported_legacy);
    w.write_i32(score.version);
    w.write_i64(score.timestamp as i64);
    w.write_std_string(&score.player_name);

    for count in [
        score.num300,
        score.num100,
        score.num50,
        score.num_gekis,
        score.num_katus,
        score.num_misses,
    ] {
        w.write_u16(saturate_u16(count));
    }

    w.write_i64(score.score as i64);
    w.write_u16(saturate_u16(score.combo_max));
    w.write_i32(score.mods as i32);

    w.write_u16(saturate_u16(score.num_slider_breaks));
    for value in [
        score.pp,
        score.unstable_rate,
        score.hit_error_avg_min,
        score.hit_error_avg_max,
        score.stars_total,
        score.stars_aim,
        score.stars_speed,
        score.speed_multiplier,
        score.cs,
        score.ar,
        score.od,
        score.hp,
    ] {
        w.write_f32(value);
    }

    if score.version > SCORES_MAX_COMBO_VERSION {
        w.write_i32(score.max_possible_combo);
        w.write_i32(score.num_hit_objects);
        w.write_i32(score.num_circles);
    }

    w.write_std_string(&score.experimental_mods);
}

fn saturate_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Writes every non-legacy score in `store` to `path`.
pub fn save_scores<P: AsRef<Path>>(path: P, store: &ScoreStore) -> Result<()> {
    encode_scores(store).write(&path)?;
    info!("Saved {} scores to {:?}", store.num_scores(), path.as_ref());
    Ok(())
}
