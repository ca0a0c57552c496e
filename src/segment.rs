//! Segment: one store file, one position index, one UUID index slice.
//!
//! Converts between absolute offsets (used by [`crate::log::Log`] and the
//! RPC layer) and segment-relative offsets (used by the position index).

use std::path::{Path, PathBuf};

use prost::Message;

use crate::booking::Booking;
use crate::error::{LogError, Result};
use crate::index::{PositionIndex, ENTRY_WIDTH};
use crate::pb;
use crate::store::Store;
use crate::uuid_index::UuidIndex;

#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig {
    pub max_store_bytes: u64,
    pub max_index_bytes: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 1024,
            max_index_bytes: 1024,
        }
    }
}

pub fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.store"))
}

pub fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.index"))
}

pub struct Segment {
    store: Store,
    index: PositionIndex,
    uuid_index: UuidIndex,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Opens (or creates) the segment rooted at `base_offset` inside `dir`.
    ///
    /// If the position index's last entry points past what the store file
    /// actually contains — a torn write from a crash between the store
    /// append and the index write — the torn entry (and, if present, the
    /// unreadable store bytes past its declared length) are dropped rather
    /// than trusted.
    pub fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self> {
        let store = Store::open(store_path(dir, base_offset))?;
        let mut index = PositionIndex::open(index_path(dir, base_offset), config.max_index_bytes)?;

        repair_torn_tail(&store, &mut index)?;

        let mut uuid_index = UuidIndex::new();
        let next_offset = if index.is_empty() {
            base_offset
        } else {
            let entry_count = index.size() / ENTRY_WIDTH;
            for slot in 0..entry_count {
                let (relative_offset, position) = index.read(slot as i64)?;
                let value = store.read(position)?;
                if let Ok(record) = pb::Record::decode(value.as_slice()) {
                    if let Some(booking) = Booking::try_from_record_value(&record.value) {
                        uuid_index.push(relative_offset, booking.uuid);
                    }
                }
            }
            let (last_relative, _) = index.read(-1)?;
            base_offset + last_relative as u64 + 1
        };

        Ok(Self {
            store,
            index,
            uuid_index,
            base_offset,
            next_offset,
            config,
        })
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// `base + len - 1`; undefined (returns `base_offset.saturating_sub(1)`)
    /// on an empty segment, matching the "no records yet" case callers must
    /// check for via `next_offset == base_offset`.
    pub fn highest_offset(&self) -> u64 {
        self.next_offset.saturating_sub(1)
    }

    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
    }

    /// Stamps `record.offset`, appends it, and updates the UUID index if
    /// the payload decodes as a booking. Returns the stamped absolute
    /// offset.
    pub fn append(&mut self, mut record: pb::Record) -> Result<u64> {
        if self.is_maxed() {
            return Err(LogError::OutOfSpace);
        }
        let offset = self.next_offset;
        record.offset = offset;
        let relative_offset = (offset - self.base_offset) as u32;

        if let Some(booking) = Booking::try_from_record_value(&record.value) {
            self.uuid_index.push(relative_offset, booking.uuid);
        }

        let encoded = record.encode_to_vec();
        let (_, position) = self.store.append(&encoded)?;
        self.index.write(relative_offset, position)?;
        self.next_offset += 1;
        Ok(offset)
    }

    pub fn read(&self, absolute_offset: u64) -> Result<pb::Record> {
        let relative = (absolute_offset - self.base_offset) as i64;
        let (_, position) = self.index.read(relative)?;
        let bytes = self.store.read(position)?;
        pb::Record::decode(bytes.as_slice()).map_err(|_| LogError::Corrupt("malformed record frame"))
    }

    /// Resolves `uuid` to its latest record, if this segment has it.
    pub fn read_booking_record(&self, uuid: &str) -> Result<Option<pb::Record>> {
        match self.uuid_index.latest_slot(uuid) {
            Some(slot) => {
                let absolute = self.base_offset + slot as u64;
                Ok(Some(self.read(absolute)?))
            }
            None => Ok(None),
        }
    }

    pub fn has_uuid(&self, uuid: &str) -> bool {
        self.uuid_index.contains(uuid)
    }

    pub fn contains_offset(&self, absolute_offset: u64) -> bool {
        absolute_offset >= self.base_offset && absolute_offset < self.next_offset
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn close(&self) -> Result<()> {
        self.store.close()
    }

    /// Closes and deletes the segment's files.
    pub fn remove(self) -> Result<()> {
        let store_path = self.store.path().to_path_buf();
        let index_path = self.index.path().to_path_buf();
        self.store.close()?;
        self.index.close()?;
        std::fs::remove_file(store_path)?;
        std::fs::remove_file(index_path)?;
        Ok(())
    }
}

/// Drops index entries (and the store bytes they point past) that the
/// store file can no longer back, from the tail inward.
fn repair_torn_tail(store: &Store, index: &mut PositionIndex) -> Result<()> {
    while !index.is_empty() {
        let (_, position) = index.read(-1)?;
        if store.read(position).is_ok() {
            break;
        }
        index.drop_last_entry();
    }
    if index.is_empty() {
        // Either there was never a committed entry, or every index entry
        // was torn; either way nothing in the store is trustworthy.
        store.truncate_to(0)?;
        return Ok(());
    }
    // The index's last trusted entry bounds how much of the store is
    // trustworthy; anything past it is an orphaned write whose index entry
    // never landed.
    let (_, position) = index.read(-1)?;
    let last_payload = store.read(position)?;
    store.truncate_to(position + crate::store::LEN_WIDTH + last_payload.len() as u64)?;
    Ok(())
}
