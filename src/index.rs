//! Position index: O(1) mapping from segment-relative offset to store
//! position.
//!
//! Backed by a memory-mapped file pre-grown to `max_bytes`. Each entry is a
//! fixed 12 bytes: a 4-byte big-endian relative offset followed by an
//! 8-byte big-endian store position. The index's logical `size` tracks how
//! many bytes of the pre-grown mapping are actually valid.

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};
use crate::mmap::MmapFile;

pub const ENTRY_WIDTH: u64 = 12;
const OFFSET_WIDTH: usize = 4;
const POSITION_WIDTH: usize = 8;

pub struct PositionIndex {
    path: PathBuf,
    mmap: MmapFile,
    max_bytes: u64,
    size: u64,
}

impl PositionIndex {
    /// Opens the index file at `path`, creating and pre-growing it to
    /// `max_bytes` if it doesn't exist yet, or re-growing an existing file
    /// (computed from its on-disk length) back up to `max_bytes`.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let path = path.into();
        let existing_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let mmap = if existing_len == 0 {
            MmapFile::create(&path, max_bytes as usize)?
        } else {
            MmapFile::open_and_grow(&path, max_bytes as usize)?
        };
        Ok(Self {
            path,
            mmap,
            max_bytes,
            size: existing_len - (existing_len % ENTRY_WIDTH),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends an entry. Fails with `OutOfSpace` when the pre-grown mapping
    /// has no room left for another entry.
    pub fn write(&mut self, relative_offset: u32, position: u64) -> Result<()> {
        if self.size + ENTRY_WIDTH > self.max_bytes {
            return Err(LogError::OutOfSpace);
        }
        let start = self.size as usize;
        let buf = self.mmap.range_mut(start, ENTRY_WIDTH as usize)?;
        buf[0..OFFSET_WIDTH].copy_from_slice(&relative_offset.to_be_bytes());
        buf[OFFSET_WIDTH..OFFSET_WIDTH + POSITION_WIDTH].copy_from_slice(&position.to_be_bytes());
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Reads the `i`-th entry. `i == -1` reads the last entry. Fails with an
    /// `UnexpectedEof` I/O error when the index is empty or `i` is out of
    /// range, surfaced as an `UnexpectedEof` I/O error.
    pub fn read(&self, i: i64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(eof());
        }
        let entry_count = (self.size / ENTRY_WIDTH) as i64;
        let index = if i == -1 { entry_count - 1 } else { i };
        if index < 0 || index >= entry_count {
            return Err(eof());
        }
        let start = (index as u64 * ENTRY_WIDTH) as usize;
        let slice = &self.mmap.as_slice()[start..start + ENTRY_WIDTH as usize];
        let relative_offset = u32::from_be_bytes(slice[0..OFFSET_WIDTH].try_into().unwrap());
        let position = u64::from_be_bytes(
            slice[OFFSET_WIDTH..OFFSET_WIDTH + POSITION_WIDTH]
                .try_into()
                .unwrap(),
        );
        Ok((relative_offset, position))
    }

    /// Drops the last entry, if any. Used at open time to discard a torn
    /// write whose store bytes never made it to disk.
    pub fn drop_last_entry(&mut self) {
        if self.size >= ENTRY_WIDTH {
            self.size -= ENTRY_WIDTH;
        }
    }

    /// Flushes the mmap and truncates the backing file to the logical
    /// size, dropping the pre-grown slack.
    pub fn close(self) -> Result<()> {
        let size = self.size;
        self.mmap.close_truncating(size)
    }
}

fn eof() -> LogError {
    LogError::Io(IoError::new(ErrorKind::UnexpectedEof, "position index exhausted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_on_empty_index_is_eof() {
        let dir = tempdir().unwrap();
        let index = PositionIndex::open(dir.path().join("0.index"), 1024).unwrap();
        assert!(matches!(index.read(-1), Err(LogError::Io(_))));
    }

    #[test]
    fn write_then_read_round_trips_and_reads_last() {
        let dir = tempdir().unwrap();
        let mut index = PositionIndex::open(dir.path().join("0.index"), 1024).unwrap();

        let entries = [(0u32, 0u64), (1, 10), (2, 25)];
        for (off, pos) in entries {
            index.write(off, pos).unwrap();
        }

        for (i, (off, pos)) in entries.iter().enumerate() {
            assert_eq!(index.read(i as i64).unwrap(), (*off, *pos));
        }
        assert_eq!(index.read(-1).unwrap(), entries[2]);
        assert!(matches!(index.read(3), Err(LogError::Io(_))));
    }

    #[test]
    fn write_past_max_bytes_is_out_of_space() {
        let dir = tempdir().unwrap();
        let mut index = PositionIndex::open(dir.path().join("0.index"), ENTRY_WIDTH).unwrap();
        index.write(0, 0).unwrap();
        assert!(matches!(index.write(1, 12), Err(LogError::OutOfSpace)));
    }

    #[test]
    fn reopen_preserves_entries_and_regrows_mapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.index");
        {
            let mut index = PositionIndex::open(&path, 1024).unwrap();
            index.write(0, 0).unwrap();
            index.write(1, 10).unwrap();
            index.close().unwrap();
        }
        // file was truncated back to its logical size on close
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * ENTRY_WIDTH);

        let reopened = PositionIndex::open(&path, 1024).unwrap();
        assert_eq!(reopened.size(), 2 * ENTRY_WIDTH);
        assert_eq!(reopened.read(-1).unwrap(), (1, 10));
    }
}
