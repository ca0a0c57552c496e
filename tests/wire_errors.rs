//! Reading past the tail is `NotFound` with a literal documented message,
//! and the booking error variants map to their expected wire codes.

use bookinglog::{Log, LogError, SegmentConfig};
use tempfile::tempdir;

fn record(value: &[u8]) -> bookinglog::pb::Record {
    bookinglog::pb::Record {
        value: value.to_vec(),
        offset: 0,
    }
}

#[test]
fn consume_past_the_tail_is_not_found_with_the_documented_message() {
    let dir = tempdir().expect("tempdir");
    let log = Log::open(dir.path(), SegmentConfig::default()).expect("log open");
    log.append(record(b"only")).expect("append");

    let err = log.read(1).expect_err("offset 1 does not exist yet");
    assert!(matches!(err, LogError::OffsetOutOfRange(1)));

    let status: tonic::Status = err.into();
    assert_eq!(status.code(), tonic::Code::NotFound);
    assert_eq!(status.message(), "no booking found for offset: 1");
}

#[test]
fn booking_not_found_maps_to_not_found_status() {
    let dir = tempdir().expect("tempdir");
    let log = Log::open(dir.path(), SegmentConfig::default()).expect("log open");

    let err = log.read_booking("missing").expect_err("no such booking");
    let status: tonic::Status = err.into();
    assert_eq!(status.code(), tonic::Code::NotFound);
    assert_eq!(status.message(), "no booking found for UUID: missing");
}

#[test]
fn out_of_space_maps_to_resource_exhausted() {
    let status: tonic::Status = LogError::OutOfSpace.into();
    assert_eq!(status.code(), tonic::Code::ResourceExhausted);
}
