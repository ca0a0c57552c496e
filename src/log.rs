//! Log: an ordered, gapless sequence of segments spanning a directory.
//!
//! Readers and writers share one `RwLock`: appends take the write side,
//! every other operation (read, booking lookup, offset queries) takes the
//! read side. Rollover happens inline inside `append` once the active
//! segment reports `is_maxed`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use prost::Message;

use crate::booking::Booking;
use crate::error::{LogError, Result};
use crate::pb;
use crate::segment::{Segment, SegmentConfig};

pub struct Log {
    dir: PathBuf,
    config: SegmentConfig,
    inner: RwLock<LogInner>,
}

struct LogInner {
    segments: Vec<Segment>,
    active: usize,
}

impl Log {
    /// Opens `dir`, discovering existing segments from `<base_offset>.store`
    /// filenames and creating the first segment at offset 0 if the
    /// directory is empty.
    pub fn open(dir: impl Into<PathBuf>, config: SegmentConfig) -> Result<Self> {
        Self::open_at(dir, config, 0)
    }

    /// Like [`Log::open`], but creates the first segment at `initial_offset`
    /// (`spec.md` §6's `Config.Segment.InitialOffset`) instead of `0` when
    /// the directory is empty. Irrelevant once segments already exist on
    /// disk: a reopened log always resumes from whatever base offsets it
    /// finds there.
    pub fn open_at(dir: impl Into<PathBuf>, config: SegmentConfig, initial_offset: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut base_offsets = discover_base_offsets(&dir)?;
        base_offsets.sort_unstable();

        let mut segments = Vec::new();
        if base_offsets.is_empty() {
            segments.push(Segment::open(&dir, initial_offset, config)?);
        } else {
            for base_offset in base_offsets {
                segments.push(Segment::open(&dir, base_offset, config)?);
            }
        }
        let active = segments.len() - 1;

        Ok(Self {
            dir,
            config,
            inner: RwLock::new(LogInner { segments, active }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends a raw record to the active segment, then rolls over to a new
    /// segment if that append left it full. Returns the stamped absolute
    /// offset.
    pub fn append(&self, mut record: pb::Record) -> Result<u64> {
        let mut inner = self.inner.write().expect("log lock poisoned");
        record.offset = 0; // stamped by the segment; caller-supplied offsets are ignored.
        let offset = inner.segments[inner.active].append(record)?;
        if inner.segments[inner.active].is_maxed() {
            let next_base = inner.segments[inner.active].next_offset();
            inner.segments.push(Segment::open(&self.dir, next_base, self.config)?);
            inner.active = inner.segments.len() - 1;
        }
        Ok(offset)
    }

    pub fn append_booking(&self, booking: &Booking) -> Result<u64> {
        self.append(pb::Record {
            value: booking.to_record_value(),
            offset: 0,
        })
    }

    pub fn read(&self, offset: u64) -> Result<pb::Record> {
        let inner = self.inner.read().expect("log lock poisoned");
        let segment = inner
            .segments
            .iter()
            .find(|s| s.contains_offset(offset))
            .ok_or(LogError::OffsetOutOfRange(offset))?;
        segment.read(offset)
    }

    /// Looks up the latest record for `uuid`, searching segments from
    /// newest to oldest so the most recent write wins.
    pub fn read_booking(&self, uuid: &str) -> Result<Booking> {
        let inner = self.inner.read().expect("log lock poisoned");
        for segment in inner.segments.iter().rev() {
            if let Some(record) = segment.read_booking_record(uuid)? {
                if let Some(booking) = Booking::try_from_record_value(&record.value) {
                    return Ok(booking);
                }
            }
        }
        Err(LogError::BookingNotFound(uuid.to_string()))
    }

    pub fn lowest_offset(&self) -> u64 {
        let inner = self.inner.read().expect("log lock poisoned");
        inner.segments.first().map(|s| s.base_offset()).unwrap_or(0)
    }

    pub fn highest_offset(&self) -> u64 {
        let inner = self.inner.read().expect("log lock poisoned");
        match inner.segments.last() {
            Some(segment) if segment.next_offset() > segment.base_offset() => segment.highest_offset(),
            Some(segment) => segment.base_offset().saturating_sub(1),
            None => 0,
        }
    }

    /// Removes every segment whose records are all `< lowest`, at
    /// segment granularity: a segment is kept in full unless its entire
    /// offset range falls below `lowest`.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut inner = self.inner.write().expect("log lock poisoned");
        let mut kept = Vec::new();
        for segment in inner.segments.drain(..) {
            if segment.next_offset() <= lowest {
                segment.remove()?;
            } else {
                kept.push(segment);
            }
        }
        if kept.is_empty() {
            kept.push(Segment::open(&self.dir, lowest, self.config)?);
        }
        inner.active = kept.len() - 1;
        inner.segments = kept;
        Ok(())
    }

    /// Returns a reader that concatenates every segment's store bytes in
    /// offset order, for bulk export/replication use cases.
    pub fn reader(&self) -> Result<Vec<u8>> {
        let inner = self.inner.read().expect("log lock poisoned");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 64 * 1024];
        for segment in inner.segments.iter() {
            let store = segment.store();
            let mut position = 0u64;
            loop {
                let n = store.read_at(&mut chunk, position)?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                position += n as u64;
            }
        }
        Ok(buf)
    }

    pub fn close(&self) -> Result<()> {
        let inner = self.inner.read().expect("log lock poisoned");
        for segment in inner.segments.iter() {
            segment.close()?;
        }
        Ok(())
    }

    /// Closes every segment and deletes the log directory entirely.
    pub fn remove(self) -> Result<()> {
        let inner = self.inner.into_inner().expect("log lock poisoned");
        for segment in inner.segments {
            segment.remove()?;
        }
        fs::remove_dir_all(&self.dir).or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }
}

fn discover_base_offsets(dir: &Path) -> Result<Vec<u64>> {
    let mut offsets = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("store") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Ok(base_offset) = stem.parse::<u64>() {
                offsets.push(base_offset);
            }
        }
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config() -> SegmentConfig {
        SegmentConfig {
            max_store_bytes: 32,
            max_index_bytes: 3 * crate::index::ENTRY_WIDTH,
        }
    }

    fn record(value: &[u8]) -> pb::Record {
        pb::Record {
            value: value.to_vec(),
            offset: 0,
        }
    }

    #[test]
    fn offsets_are_gapless_and_start_at_zero() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), SegmentConfig::default()).unwrap();
        for (i, payload) in [b"a".as_slice(), b"b", b"c"].iter().enumerate() {
            let offset = log.append(record(payload)).unwrap();
            assert_eq!(offset, i as u64);
        }
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 2);
    }

    #[test]
    fn rollover_creates_a_second_segment_on_disk() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..6 {
            log.append(record(b"0123456789")).unwrap();
        }
        let store_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("store"))
            .collect();
        assert!(store_files.len() >= 2, "expected rollover to produce multiple segments");
    }

    #[test]
    fn reopen_preserves_offsets_and_byte_identical_reads() {
        let dir = tempdir().unwrap();
        {
            let log = Log::open(dir.path(), small_config()).unwrap();
            for i in 0..6u8 {
                log.append(record(&[i])).unwrap();
            }
            log.close().unwrap();
        }
        let reopened = Log::open(dir.path(), small_config()).unwrap();
        assert_eq!(reopened.lowest_offset(), 0);
        assert_eq!(reopened.highest_offset(), 5);
        for i in 0..6u8 {
            assert_eq!(reopened.read(i as u64).unwrap().value, vec![i]);
        }
    }

    #[test]
    fn open_at_honors_a_nonzero_initial_offset_on_an_empty_directory() {
        let dir = tempdir().unwrap();
        let log = Log::open_at(dir.path(), SegmentConfig::default(), 100).unwrap();
        let offset = log.append(record(b"first")).unwrap();
        assert_eq!(offset, 100);
        assert_eq!(log.lowest_offset(), 100);
        assert_eq!(log.highest_offset(), 100);
    }

    #[test]
    fn open_at_ignores_initial_offset_once_segments_exist() {
        let dir = tempdir().unwrap();
        {
            let log = Log::open(dir.path(), SegmentConfig::default()).unwrap();
            log.append(record(b"a")).unwrap();
            log.close().unwrap();
        }
        // a nonzero initial_offset must not resurrect/relocate the existing
        // base-0 segment on reopen.
        let reopened = Log::open_at(dir.path(), SegmentConfig::default(), 100).unwrap();
        assert_eq!(reopened.lowest_offset(), 0);
    }

    #[test]
    fn read_past_highest_offset_is_out_of_range() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), SegmentConfig::default()).unwrap();
        log.append(record(b"only")).unwrap();
        assert!(matches!(log.read(1), Err(LogError::OffsetOutOfRange(1))));
    }

    #[test]
    fn booking_latest_write_wins_across_appends() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), SegmentConfig::default()).unwrap();
        let mut booking = Booking {
            uuid: "u-1".to_string(),
            email: "a@b.com".to_string(),
            full_name: "A".to_string(),
            start_date: "2023-01-01".to_string(),
            end_date: "2023-01-02".to_string(),
            active: true,
            created_at: Some(1),
            updated_at: None,
        };
        log.append_booking(&booking).unwrap();
        booking.updated_at = Some(2);
        booking.full_name = "A Updated".to_string();
        log.append_booking(&booking).unwrap();

        let found = log.read_booking("u-1").unwrap();
        assert_eq!(found.full_name, "A Updated");
        assert_eq!(found.updated_at, Some(2));
        assert_eq!(found.created_at, Some(1));
    }

    #[test]
    fn booking_not_found_is_the_expected_error() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), SegmentConfig::default()).unwrap();
        assert!(matches!(
            log.read_booking("missing"),
            Err(LogError::BookingNotFound(ref uuid)) if uuid == "missing"
        ));
    }

    #[test]
    fn truncate_drops_only_fully_consumed_segments() {
        let dir = tempdir().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..6 {
            log.append(record(b"0123456789")).unwrap();
        }
        let lowest_before = log.lowest_offset();
        log.truncate(lowest_before + 2).unwrap();
        assert!(log.lowest_offset() >= lowest_before);
    }
}
