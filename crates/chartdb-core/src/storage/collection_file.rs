//! Collection files.
//!
//! Layout: `version: i32`, `count: i32`, then per collection its name,
//! `members: i32` and the member hashes. The legacy file uses the external
//! string encoding, ours uses `u32`-prefixed strings.

use std::path::Path;

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::chart::ChartLibrary;
use crate::codec::{BinaryFile, ByteBuffer, ByteWriter};
use crate::collection::CollectionStore;
use crate::config::versions::COLLECTIONS_VERSION;
use crate::error::{Error, Result};
use crate::hash::Md5Hash;

/// Which collection file is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionSource {
    /// The external application's file, accepted up to the given version.
    Legacy { max_version: i32 },
    Custom,
}

impl CollectionSource {
    fn is_legacy(self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    fn max_version(self) -> i32 {
        match self {
            Self::Legacy { max_version } => max_version,
            Self::Custom => COLLECTIONS_VERSION,
        }
    }
}

/// Merges the collections stored at `path` into `store`.
///
/// Returns the number of entries added.
///
/// # Errors
///
/// `NotReady` for an unreadable file and `VersionTooNew` for a file beyond
/// the source's ceiling; both leave `store` untouched. On cancellation the
/// whole store is cleared and `Cancelled` returned, since a partial merge
/// cannot be resumed.
pub fn load_collections<P: AsRef<Path>>(
    path: P,
    source: CollectionSource,
    store: &mut CollectionStore,
    library: &ChartLibrary,
    cancel: &CancelToken,
) -> Result<usize> {
    let file = BinaryFile::open(path)?;
    let result = parse_collections(file.bytes(), source, store, library, cancel);

    match &result {
        Ok(added) => info!(
            "Loaded {} collection entries from {:?}",
            added,
            file.path()
        ),
        Err(Error::Cancelled) => store.clear(),
        Err(e) => warn!("Failed to load collections from {:?}: {}", file.path(), e),
    }
    store.sort();
    result
}

fn parse_collections(
    data: &[u8],
    source: CollectionSource,
    store: &mut CollectionStore,
    library: &ChartLibrary,
    cancel: &CancelToken,
) -> Result<usize> {
    let mut buf = ByteBuffer::new(data);
    let version = buf.read_i32()?;
    let maximum = source.max_version();
    if version > maximum {
        warn!(
            "Collection file version {} is newer than supported {}",
            version, maximum
        );
        return Err(Error::VersionTooNew { version, maximum });
    }

    let read_string = |buf: &mut ByteBuffer<'_>| match source {
        CollectionSource::Legacy { .. } => buf.read_osu_string(),
        CollectionSource::Custom => buf.read_std_string(),
    };

    let count = buf.read_i32()?;
    let mut added = 0;
    for _ in 0..count.max(0) {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let name = read_string(&mut buf)?;
        let members = buf.read_i32()?;
        let mut hashes: Vec<Md5Hash> = Vec::with_capacity(members.clamp(0, 4096) as usize);
        for _ in 0..members.max(0) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let raw = read_string(&mut buf)?;
            match Md5Hash::parse(&raw) {
                Some(hash) => hashes.push(hash),
                None => warn!("Skipping invalid hash {:?} in collection {:?}", raw, name),
            }
        }

        added += store.merge(&name, source.is_legacy(), &hashes, library);
    }
    Ok(added)
}

/// Serializes our own collection data.
///
/// Legacy entries are left out, and so are legacy collections holding
/// nothing of ours.
pub fn encode_collections(store: &CollectionStore) -> ByteWriter {
    let kept: Vec<_> = store
        .collections()
        .iter()
        .filter(|c| c.has_custom_data())
        .collect();

    let mut w = ByteWriter::new();
    w.write_i32(COLLECTIONS_VERSION);
    w.write_i32(kept.len() as i32);
    for collection in kept {
        let entries: Vec<_> = collection.entries().iter().filter(|e| !e.legacy).collect();
        w.write_std_string(collection.name());
        w.write_i32(entries.len() as i32);
        for entry in entries {
            w.write_std_string(entry.hash.as_str());
        }
    }
    w
}

pub fn save_collections<P: AsRef<Path>>(path: P, store: &CollectionStore) -> Result<()> {
    encode_collections(store).write(&path)?;
    info!("Saved {} collections to {:?}", store.len(), path.as_ref());
    Ok(())
}
