//! Side cache of star ratings the external database could not provide.
//!
//! Layout: `version: i32`, `digest: string`, `count: i64`, then `count` pairs
//! of `(hash: string, stars: f32)`. The digest is the MD5 of everything after
//! it; a mismatch means the cache is ignored, exactly as if it were missing.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::codec::{BinaryFile, ByteBuffer, ByteWriter, md5_hex};
use crate::config::versions::STARS_CACHE_VERSION;
use crate::error::Result;
use crate::hash::Md5Hash;

/// Marks a rating whose calculation failed; never persisted.
pub const STARS_FAILED_SENTINEL: f32 = -1.0;

#[derive(Debug, Clone, Default)]
pub struct StarsCache {
    entries: HashMap<Md5Hash, f32>,
    dirty: bool,
}

impl StarsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache from file.
    ///
    /// Returns `Error::NotReady` if the file cannot be read. A file with an
    /// unknown version, a bad digest or a truncated body yields an empty cache.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = BinaryFile::open(path)?;
        Ok(Self::parse(file.bytes()))
    }

    pub fn parse(data: &[u8]) -> Self {
        let mut buf = ByteBuffer::new(data);
        match Self::parse_inner(&mut buf) {
            Ok(Some(entries)) => {
                info!("Loaded {} cached star ratings", entries.len());
                Self {
                    entries,
                    dirty: false,
                }
            }
            Ok(None) => Self::new(),
            Err(e) => {
                warn!("Stars cache is corrupt ({}), ignoring it", e);
                Self::new()
            }
        }
    }

    fn parse_inner(buf: &mut ByteBuffer<'_>) -> Result<Option<HashMap<Md5Hash, f32>>> {
        let version = buf.read_i32()?;
        if version > STARS_CACHE_VERSION {
            warn!(
                "Stars cache version {} is newer than supported {}, ignoring it",
                version, STARS_CACHE_VERSION
            );
            return Ok(None);
        }

        let stored_digest = buf.read_std_string()?;
        let actual_digest = md5_hex(buf.rest());
        if stored_digest != actual_digest.as_str() {
            warn!("Stars cache digest mismatch, ignoring it");
            return Ok(None);
        }

        let count = buf.read_i64()?;
        let mut entries = HashMap::new();
        for _ in 0..count.max(0) {
            let hash = buf.read_std_string()?;
            let stars = buf.read_f32()?;
            match Md5Hash::parse(&hash) {
                Some(hash) => {
                    entries.insert(hash, stars);
                }
                None => debug!("Skipping stars cache entry with invalid hash {:?}", hash),
            }
        }
        Ok(Some(entries))
    }

    pub fn get(&self, hash: &Md5Hash) -> Option<f32> {
        self.entries.get(hash).copied()
    }

    pub fn insert(&mut self, hash: Md5Hash, stars: f32) {
        if self.entries.insert(hash, stars) != Some(stars) {
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }

    /// Serializes the cache, leaving out zero and failed ratings.
    fn encode(&self) -> ByteWriter {
        let mut kept: Vec<(&Md5Hash, f32)> = self
            .entries
            .iter()
            .map(|(hash, &stars)| (hash, stars))
            .filter(|&(_, stars)| stars != 0.0 && stars != STARS_FAILED_SENTINEL)
            .collect();
        kept.sort_by(|a, b| a.0.cmp(b.0));

        let mut body = ByteWriter::new();
        body.write_i64(kept.len() as i64);
        for (hash, stars) in kept {
            body.write_std_string(hash.as_str());
            body.write_f32(stars);
        }

        let mut out = ByteWriter::new();
        out.write_i32(STARS_CACHE_VERSION);
        out.write_std_string(md5_hex(body.as_bytes()).as_str());
        out.write_bytes(body.as_bytes());
        out
    }

    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.encode().write(path)?;
        self.dirty = false;
        Ok(())
    }
}
