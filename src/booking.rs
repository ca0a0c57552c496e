//! Booking domain type and the single payload-decode hook the segment uses
//! to keep its UUID index current.
//!
//! A booking is persisted as a `Record` whose `value` is the JSON encoding
//! of [`Booking`] — the outer `Record` is protobuf-marshaled but its
//! `value` field holds a plain JSON blob. On the wire, `Booking` is a
//! first-class `prost` message (see `proto/log.proto`); the two
//! representations are converted at the RPC boundary only.

use serde::{Deserialize, Serialize};

use crate::pb;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub uuid: String,
    pub email: String,
    pub full_name: String,
    pub start_date: String,
    pub end_date: String,
    pub active: bool,
    /// Unix nanoseconds; `None` until the booking has first been created.
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Booking {
    /// Serializes this booking as the payload of a log `Record`.
    pub fn to_record_value(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Booking serializes to JSON infallibly")
    }

    /// Attempts to decode a `Record.value` byte slice as a booking. This is
    /// the one place the log layer needs to know about booking shape; it
    /// returns `None` (not an error) for records that simply aren't
    /// bookings, since the log stores arbitrary opaque payloads too.
    pub fn try_from_record_value(value: &[u8]) -> Option<Booking> {
        serde_json::from_slice(value).ok()
    }
}

impl From<pb::Booking> for Booking {
    fn from(b: pb::Booking) -> Self {
        Booking {
            uuid: b.uuid,
            email: b.email,
            full_name: b.full_name,
            start_date: b.start_date,
            end_date: b.end_date,
            active: b.active,
            created_at: b.created_at.map(timestamp_to_nanos),
            updated_at: b.updated_at.map(timestamp_to_nanos),
        }
    }
}

impl From<Booking> for pb::Booking {
    fn from(b: Booking) -> Self {
        pb::Booking {
            uuid: b.uuid,
            email: b.email,
            full_name: b.full_name,
            start_date: b.start_date,
            end_date: b.end_date,
            active: b.active,
            created_at: b.created_at.map(nanos_to_timestamp),
            updated_at: b.updated_at.map(nanos_to_timestamp),
        }
    }
}

pub fn timestamp_to_nanos(ts: prost_types::Timestamp) -> i64 {
    ts.seconds.saturating_mul(1_000_000_000) + ts.nanos as i64
}

pub fn nanos_to_timestamp(nanos: i64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: nanos.div_euclid(1_000_000_000),
        nanos: nanos.rem_euclid(1_000_000_000) as i32,
    }
}

/// The `now` used to stamp `created_at`/`updated_at` — a single seam so
/// tests can avoid depending on wall-clock time if they ever need to.
pub fn now_nanos() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64
}
