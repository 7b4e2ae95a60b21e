//! Fixed-length byte buffers with a cursor.
//!
//! Every on-disk structure is encoded through [`BufferWriter`] and decoded
//! through [`BufferReader`]. Integers are big-endian. Strings are ASCII, either
//! length-prefixed (`u32` length followed by the bytes) or written into a slot
//! of caller-specified size without a prefix.
//!
//! Reads and writes never grow the buffer: asking for more bytes than remain
//! fails with [`Error::Overflow`].

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix in front of a string or blob.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Cursor over a read-only byte slice of fixed length.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BufferReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Move the cursor to an absolute offset inside the buffer.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::overflow(offset, self.data.len()));
        }
        self.offset = offset;
        Ok(())
    }

    /// Move the cursor back to the start.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        if size > self.remaining() {
            return Err(Error::overflow(size, self.remaining()));
        }
        let start = self.offset;
        self.offset += size;
        Ok(&self.data[start..self.offset])
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16())
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32())
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.take(8)?.get_u64())
    }

    /// Borrow the next `size` raw bytes.
    pub fn read_bytes(&mut self, size: usize) -> Result<&'a [u8]> {
        self.take(size)
    }

    /// Read an ASCII string occupying exactly `size` bytes.
    ///
    /// Trailing zero padding is stripped.
    pub fn read_ascii_string_sized(&mut self, size: usize) -> Result<String> {
        let raw = self.take(size)?;
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        ascii_to_string(&raw[..end])
    }

    /// Read a length-prefixed ASCII string.
    pub fn read_ascii_string(&mut self) -> Result<String> {
        let size = self.read_u32()? as usize;
        let raw = self.take(size)?;
        ascii_to_string(raw)
    }
}

fn ascii_to_string(raw: &[u8]) -> Result<String> {
    if !raw.is_ascii() {
        return Err(Error::corruption("non-ASCII bytes in string field"));
    }
    // ASCII is always valid UTF-8.
    Ok(raw.iter().map(|&b| b as char).collect())
}

/// Cursor over a zero-filled writable buffer of fixed length.
#[derive(Debug)]
pub struct BufferWriter {
    buf: BytesMut,
    offset: usize,
}

impl BufferWriter {
    /// Create a zero-filled buffer of `len` bytes with the cursor at 0.
    pub fn new(len: usize) -> Self {
        Self { buf: BytesMut::zeroed(len), offset: 0 }
    }

    /// Total length of the buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Move the cursor to an absolute offset inside the buffer.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.buf.len() {
            return Err(Error::overflow(offset, self.buf.len()));
        }
        self.offset = offset;
        Ok(())
    }

    fn slot(&mut self, size: usize) -> Result<&mut [u8]> {
        if size > self.remaining() {
            return Err(Error::overflow(size, self.remaining()));
        }
        let start = self.offset;
        self.offset += size;
        Ok(&mut self.buf[start..start + size])
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.slot(1)?.put_u8(value);
        Ok(())
    }

    /// Write a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.slot(2)?.put_u16(value);
        Ok(())
    }

    /// Write a big-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.slot(4)?.put_u32(value);
        Ok(())
    }

    /// Write a big-endian `u64`.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.slot(8)?.put_u64(value);
        Ok(())
    }

    /// Copy raw bytes at the cursor.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.slot(value.len())?.copy_from_slice(value);
        Ok(())
    }

    /// Write an ASCII string into a slot of exactly `size` bytes, zero padded.
    pub fn write_ascii_string_sized(&mut self, value: &str, size: usize) -> Result<()> {
        check_ascii(value)?;
        if value.len() > size {
            return Err(Error::overflow(value.len(), size));
        }
        let slot = self.slot(size)?;
        slot[..value.len()].copy_from_slice(value.as_bytes());
        Ok(())
    }

    /// Write a length-prefixed ASCII string.
    pub fn write_ascii_string(&mut self, value: &str) -> Result<()> {
        check_ascii(value)?;
        let total = LENGTH_PREFIX_SIZE + value.len();
        if total > self.remaining() {
            return Err(Error::overflow(total, self.remaining()));
        }
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes())
    }

    /// Borrow the whole buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return the full buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

fn check_ascii(value: &str) -> Result<()> {
    if value.is_ascii() {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("string {:?} is not ASCII", value)))
    }
}
