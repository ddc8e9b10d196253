//! In-memory writer mirroring [`ByteBuffer`](super::ByteBuffer).
//!
//! Values are buffered until [`ByteWriter::write`] flushes them to disk. The
//! flush goes through a temporary file in the target directory which is then
//! renamed over the destination, so a failed write leaves the previous file
//! untouched.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uleb128(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(byte);
                return;
            }
            self.write_u8(byte | 0x80);
        }
    }

    /// Writes an external-dialect string. Empty strings use the 0x00 marker.
    pub fn write_osu_string(&mut self, value: &str) {
        if value.is_empty() {
            self.write_u8(0x00);
            return;
        }
        self.write_u8(0x0b);
        self.write_uleb128(value.len() as u64);
        self.write_bytes(value.as_bytes());
    }

    /// Writes an own-dialect string (`u32` length prefix).
    pub fn write_std_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value.as_bytes());
    }

    /// Flushes the buffer to `path`, replacing the file atomically.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&self.buf)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;

        debug!("Wrote {} bytes to {:?}", self.buf.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteBuffer;

    #[test]
    fn test_uleb128_encoding() {
        let mut w = ByteWriter::new();
        w.write_uleb128(624485);
        assert_eq!(w.as_bytes(), &[0xE5, 0x8E, 0x26]);
    }

    #[test]
    fn test_mixed_fields_read_back() {
        let mut w = ByteWriter::new();
        w.write_i32(20190101);
        w.write_osu_string("");
        w.write_osu_string("Artist");
        w.write_std_string("player");
        w.write_f64(1.5);
        w.write_bool(true);

        let bytes = w.into_bytes();
        let mut r = ByteBuffer::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), 20190101);
        assert_eq!(r.read_osu_string().unwrap(), "");
        assert_eq!(r.read_osu_string().unwrap(), "Artist");
        assert_eq!(r.read_std_string().unwrap(), "player");
        assert_eq!(r.read_f64().unwrap(), 1.5);
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");
        std::fs::write(&path, b"old contents").unwrap();

        let mut w = ByteWriter::new();
        w.write_u32(7);
        w.write(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![7, 0, 0, 0]);
    }

    #[test]
    fn test_failed_write_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.db");

        let mut w = ByteWriter::new();
        w.write_u32(7);
        assert!(w.write(&path).is_err());
        assert!(!path.exists());
    }
}
