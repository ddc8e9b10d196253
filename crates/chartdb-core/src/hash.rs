//! The 32-character content digest used as the join key between
//! difficulties, scores, collections and the stars cache.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// Length of a hex-encoded MD5 digest.
pub const HASH_LEN: usize = 32;

/// A hex MD5 digest stored inline.
///
/// Only the length and ASCII-ness are validated; the text is kept exactly as
/// the source file wrote it, so comparisons are case-sensitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Md5Hash([u8; HASH_LEN]);

impl Md5Hash {
    /// Parses a hash, returning `None` unless `s` is exactly 32 ASCII bytes.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != HASH_LEN || !bytes.is_ascii() {
            return None;
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(bytes);
        Some(Self(out))
    }

    /// Hex-encodes a computed digest (lowercase).
    pub fn from_digest(digest: md5::Digest) -> Self {
        let hex = format!("{:x}", digest);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(hex.as_bytes());
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII input.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for Md5Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidHash(s.to_string()))
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Md5Hash({})", self.as_str())
    }
}

impl Serialize for Md5Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
