//! Random access file capability.
//!
//! The pager only needs to seek, read a range, write at the current position
//! and report where it is. [`FileHandle`] backs that with an OS file and
//! [`MemoryFile`] with a growable byte vector.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file that can be read and written at arbitrary offsets.
pub trait RandomAccessFile: Send {
    /// Move the write position to `pos`.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Read `len` bytes starting at `offset`.
    ///
    /// Bytes past the end of the file read as zero, so the result is always
    /// exactly `len` bytes long.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Write `data` at the current position and advance past it.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Current position.
    fn position(&mut self) -> Result<u64>;

    /// Flush buffered writes to durable storage.
    fn sync(&mut self) -> Result<()>;

    /// Length of the file in bytes.
    fn size(&mut self) -> Result<u64>;

    /// Release the underlying handle. Does not sync.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// [`RandomAccessFile`] over an OS file opened for reading and writing.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    file: File,
}

impl FileHandle {
    /// Open an existing file, or create it when `create` is set.
    pub fn open<P: AsRef<Path>>(path: P, create: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                log::debug!("Failed to open {:?}: {}", path, e);
                Error::InvalidPath(path.clone())
            })?;
        Ok(Self { path, file })
    }

    /// Path the handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RandomAccessFile for FileHandle {
    fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// In-memory [`RandomAccessFile`].
///
/// Clones share the same contents but keep their own position, so a test can
/// hand one clone to a database and inspect or reopen through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
}

impl MemoryFile {
    /// Create an empty in-memory file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory file holding `data`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data: Arc::new(Mutex::new(data)), pos: 0 }
    }

    /// Copy of the current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Overwrite bytes at `offset`, growing the file if needed.
    pub fn patch(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.data.lock();
        let end = offset + bytes.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
    }
}

impl RandomAccessFile for MemoryFile {
    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos as usize;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.data.lock();
        let start = (offset as usize).min(data.len());
        let end = (offset as usize).saturating_add(len).min(data.len());
        let mut buf = vec![0u8; len];
        buf[..end - start].copy_from_slice(&data[start..end]);
        self.pos = offset as usize + len;
        Ok(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.patch(self.pos, bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.data.lock().len() as u64)
    }
}
