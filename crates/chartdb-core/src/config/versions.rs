//! Format version boundaries.
//!
//! External database versions are dates (`YYYYMMDD`) chosen by the external
//! application; our own formats follow the same convention.

/// Oldest external database layout that can be parsed at all.
pub const DB_MIN_VERSION: i32 = 20140609;

/// Oldest external database layout this crate accepts.
pub const DB_MIN_SUPPORTED_VERSION: i32 = 20170222;

/// From this version on, entries no longer carry a leading size field.
pub const DB_SIZE_PREFIX_REMOVED: i32 = 20191106;

/// From this version on, star ratings are stored as `f32` instead of `f64`.
pub const DB_FLOAT_STARS: i32 = 20250107;

/// Default ceiling above which the raw scanner is used instead.
pub const DB_DEFAULT_MAX_VERSION: i32 = 20250108;

/// Legacy score files store the online score id as `i64` from this version on.
pub const LEGACY_SCORES_ONLINE_ID_I64: i32 = 20140721;

/// Scores newer than this carry max-combo / hit object counts.
pub const SCORES_MAX_COMBO_VERSION: i32 = 20180722;

/// Files from this version on pack the imported-legacy flag into the mode byte.
pub const SCORES_PACKED_IMPORT_FLAG: i32 = 20210103;

/// Current custom score file version. Carries an explicit imported-legacy byte.
pub const SCORES_VERSION: i32 = 20240412;

/// Current custom collection file version.
pub const COLLECTIONS_VERSION: i32 = 20240412;

/// Current stars cache version.
pub const STARS_CACHE_VERSION: i32 = 20221108;
