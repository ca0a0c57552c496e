//! After `truncate(n)`, every surviving segment's highest offset is `>= n`
//! and every removed segment's highest offset was `< n` (whole-segment
//! granularity).

use bookinglog::{Log, SegmentConfig};
use tempfile::tempdir;

fn record(value: &[u8]) -> bookinglog::pb::Record {
    bookinglog::pb::Record {
        value: value.to_vec(),
        offset: 0,
    }
}

#[test]
fn truncate_keeps_only_segments_whose_range_reaches_the_watermark() {
    let dir = tempdir().expect("tempdir");
    let config = SegmentConfig {
        max_store_bytes: 32,
        max_index_bytes: 1024,
    };
    let log = Log::open(dir.path(), config).expect("log open");

    // 20-byte payloads, 32-byte segments => one record per segment, six
    // segments with base offsets 0..6.
    for _ in 0..6 {
        log.append(record(&[0u8; 20])).expect("append");
    }
    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 5);

    log.truncate(3).expect("truncate");

    assert_eq!(log.lowest_offset(), 3);
    assert_eq!(log.highest_offset(), 5);
    assert!(log.read(2).is_err(), "offset below the watermark's segment was removed");
    for offset in 3..=5u64 {
        assert!(log.read(offset).is_ok(), "offset {offset} should survive truncation");
    }
}

#[test]
fn truncate_below_the_lowest_offset_is_a_no_op() {
    let dir = tempdir().expect("tempdir");
    let log = Log::open(dir.path(), SegmentConfig::default()).expect("log open");
    log.append(record(b"a")).expect("append");
    log.append(record(b"b")).expect("append");

    log.truncate(0).expect("truncate");

    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 1);
}
