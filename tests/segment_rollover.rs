//! Rollover once the active segment is maxed.

use bookinglog::{Log, SegmentConfig};
use tempfile::tempdir;

fn record(value: &[u8]) -> bookinglog::pb::Record {
    bookinglog::pb::Record {
        value: value.to_vec(),
        offset: 0,
    }
}

#[test]
fn rollover_produces_two_store_files_and_both_ends_read() {
    let dir = tempdir().expect("tempdir");
    let config = SegmentConfig {
        max_store_bytes: 32,
        max_index_bytes: 1024,
    };
    let log = Log::open(dir.path(), config).expect("log open");

    for _ in 0..3 {
        log.append(record(&[0u8; 20])).expect("append");
    }

    let store_files: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read_dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("store"))
        .collect();
    assert_eq!(store_files.len(), 2, "expected exactly two segments on disk");

    assert_eq!(log.highest_offset(), 2);
    assert_eq!(log.read(0).expect("read first").value, vec![0u8; 20]);
    assert_eq!(log.read(2).expect("read last").value, vec![0u8; 20]);
}
