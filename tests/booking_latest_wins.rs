//! `read_booking` always returns the most recently appended booking state
//! for a UUID.

use bookinglog::{Booking, Log, SegmentConfig};
use tempfile::tempdir;

#[test]
fn update_wins_over_create() {
    let dir = tempdir().expect("tempdir");
    let log = Log::open(dir.path(), SegmentConfig::default()).expect("log open");

    let created = Booking {
        uuid: "U".to_string(),
        email: "a@b.com".to_string(),
        full_name: "Ada".to_string(),
        start_date: "2023-01-01".to_string(),
        end_date: "2023-01-02".to_string(),
        active: true,
        created_at: Some(1_000),
        updated_at: None,
    };
    log.append_booking(&created).expect("create");

    let updated = Booking {
        start_date: "2023-02-15".to_string(),
        updated_at: Some(2_000),
        ..created.clone()
    };
    log.append_booking(&updated).expect("update");

    let found = log.read_booking("U").expect("get booking");
    assert_eq!(found.start_date, "2023-02-15");
    assert_eq!(found.updated_at, Some(2_000));
    assert_eq!(found.created_at, Some(1_000));
}
