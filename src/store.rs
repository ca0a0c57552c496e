//! Append-only store file: length-prefixed byte blobs with random read.
//!
//! Every record is framed as an 8-byte big-endian length followed by that
//! many payload bytes; `append` returns the byte position of the length
//! prefix so the position index can record it. A single mutex serializes
//! all operations, guarding the file behind one lock.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

pub const LEN_WIDTH: u64 = 8;

struct StoreInner {
    file: File,
    writer: BufWriter<File>,
    size: u64,
}

pub struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Opens (creating if necessary) the store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        let writer = BufWriter::new(file.try_clone()?);
        Ok(Self {
            path,
            inner: Mutex::new(StoreInner {
                file,
                writer,
                size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.inner.lock().expect("store mutex poisoned").size
    }

    /// Writes the length prefix then the payload; returns
    /// `(bytes_written, position)` where `position` is the start of the
    /// length prefix.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let position = inner.size;
        let len = payload.len() as u64;
        inner.writer.write_all(&len.to_be_bytes())?;
        inner.writer.write_all(payload)?;
        inner.writer.flush()?;
        let written = LEN_WIDTH + len;
        inner.size += written;
        Ok((written, position))
    }

    /// Reads the record whose length prefix starts at `position`.
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.writer.flush()?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        inner.file.seek(SeekFrom::Start(position))?;
        inner.file.read_exact(&mut len_buf)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        inner.file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Raw positional read used by the log's sequential reader.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.writer.flush()?;
        inner.file.seek(SeekFrom::Start(offset))?;
        let n = inner.file.read(buf)?;
        Ok(n)
    }

    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.writer.flush()?;
        Ok(())
    }

    /// Truncates the file down to `len` bytes, discarding anything past it.
    /// Used at open time to drop a torn trailing append the position index
    /// never recorded.
    pub fn truncate_to(&self, len: u64) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if len >= inner.size {
            return Ok(());
        }
        inner.writer.flush()?;
        inner.file.set_len(len)?;
        inner.file.seek(SeekFrom::Start(len))?;
        inner.writer = BufWriter::new(inner.file.try_clone()?);
        inner.size = len;
        Ok(())
    }
}
