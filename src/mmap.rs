//! Thin wrapper around a writable memory-mapped file.
//!
//! Used by [`crate::index::PositionIndex`] to back its fixed-width entries.
//! The file is grown to its final, pre-sized length up front so the mapping
//! never has to be resized.

use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};

use crate::error::{LogError, Result};

pub struct MmapFile {
    file: File,
    map: MmapMut,
    len: usize,
}

impl MmapFile {
    /// Creates (or truncates) the file at `path` and grows it to `len` bytes.
    pub fn create(path: &Path, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(LogError::Corrupt("mmap length must be non-zero"));
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len as u64)?;
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self { file, map, len })
    }

    /// Opens an existing file and re-grows it to `len` bytes, preserving the
    /// existing prefix. Used on reopen, where the file was previously
    /// truncated back to its logical size by [`MmapFile::close_truncating`].
    pub fn open_and_grow(path: &Path, len: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        file.set_len(len as u64)?;
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self { file, map, len })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(LogError::Corrupt("range overflow"))?;
        if end > self.len {
            return Err(LogError::Corrupt("range out of bounds"));
        }
        Ok(&mut self.map[offset..end])
    }

    /// Flushes, then truncates the backing file down to `logical_len`,
    /// dropping the pre-grown slack.
    pub fn close_truncating(self, logical_len: u64) -> Result<()> {
        self.map.flush()?;
        self.file.set_len(logical_len)?;
        Ok(())
    }
}
