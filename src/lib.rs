//! Segmented, offset-addressed append-only log for booking events, served
//! over mutually authenticated streaming gRPC.

pub mod auth;
pub mod booking;
pub mod config;
pub mod error;
pub mod index;
pub mod log;
mod mmap;
pub mod segment;
pub mod server;
pub mod store;
pub mod uuid_index;

pub mod pb {
    tonic::include_proto!("log.v1");
}

pub use booking::Booking;
pub use config::Config;
pub use error::{LogError, Result};
pub use log::Log;
pub use segment::SegmentConfig;
