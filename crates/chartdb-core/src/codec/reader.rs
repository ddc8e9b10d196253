//! Cursor-based reader for the two binary dialects.
//!
//! `ByteBuffer` wraps a byte slice and tracks a read position. Every read is
//! bounds-checked: running past the end yields [`Error::UnexpectedEof`]
//! instead of touching memory outside the slice.
//!
//! Strings come in two flavours:
//! - the external dialect: a presence byte (0 = empty, otherwise 0x0b) followed
//!   by an unsigned LEB128 byte count and the UTF-8 payload
//! - our own dialect: a little-endian `u32` byte count and the UTF-8 payload

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Upper bound for a single string payload.
///
/// Anything longer is treated as stream corruption rather than allocated.
const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// A position-tracking byte reader for parsing binary files.
///
/// # Example
///
/// ```
/// use chartdb_core::codec::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, 0x0b, 0x02, b'h', b'i'];
/// let mut buf = ByteBuffer::new(&data);
///
/// assert_eq!(buf.read_i32().unwrap(), 0x12345678);
/// assert_eq!(buf.read_osu_string().unwrap(), "hi");
/// assert_eq!(buf.remaining(), 0);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes remaining from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns the unread tail without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Skips the specified number of bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if skipping would go beyond the buffer length.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Reads the specified number of bytes and advances the position.
    ///
    /// # Errors
    ///
    /// Returns an error if there are not enough bytes remaining.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::UnexpectedEof {
                position: self.pos,
                wanted: count,
                len: self.data.len(),
            })?;

        let result = &self.data[self.pos..end];
        self.pos = end;
        Ok(result)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads one byte; any non-zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads an unsigned LEB128 integer.
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift < 64 {
                value |= u64::from(byte & 0x7f) << shift;
            }
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 + 7 {
                return Err(Error::StreamCorrupted(format!(
                    "ULEB128 value too long at position {}",
                    self.pos
                )));
            }
        }
    }

    /// Reads an external-dialect string (presence byte + ULEB128 length).
    pub fn read_osu_string(&mut self) -> Result<String> {
        if self.read_u8()? == 0 {
            return Ok(String::new());
        }
        let len = self.read_uleb128()?;
        self.read_utf8(len)
    }

    /// Advances past an external-dialect string without decoding it.
    pub fn skip_osu_string(&mut self) -> Result<()> {
        if self.read_u8()? == 0 {
            return Ok(());
        }
        let len = self.read_uleb128()?;
        let len = usize::try_from(len).map_err(|_| self.too_long(len))?;
        self.skip(len)
    }

    /// Reads an own-dialect string (`u32` length prefix).
    pub fn read_std_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        self.read_utf8(u64::from(len))
    }

    fn read_utf8(&mut self, len: u64) -> Result<String> {
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_STRING_LEN)
            .ok_or_else(|| self.too_long(len))?;
        let bytes = self.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => {
                debug!("Invalid UTF-8 in string at position {}", self.pos - len);
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    fn too_long(&self, len: u64) -> Error {
        Error::StreamCorrupted(format!(
            "string of {} bytes at position {} exceeds limit",
            len, self.pos
        ))
    }
}

/// The full contents of a binary file, ready to be wrapped in a [`ByteBuffer`].
///
/// A file that cannot be opened or read is reported as [`Error::NotReady`];
/// callers treat that as "nothing to load".
#[derive(Debug, Clone)]
pub struct BinaryFile {
    path: PathBuf,
    data: Vec<u8>,
}

impl BinaryFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(data) => Ok(Self {
                path: path.to_path_buf(),
                data,
            }),
            Err(e) => {
                debug!("Cannot read {:?}: {}", path, e);
                Err(Error::NotReady(path.to_path_buf()))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn reader(&self) -> ByteBuffer<'_> {
        ByteBuffer::new(&self.data)
    }
}
