//! # Wire
//!
//! Framing and integrity for peer traffic.
//!
//! ## Architecture
//!
//! ```text
//! socket bytes ──► WireReader ──► ParcelCodec::decode ──► Message::decode
//!                                   │ length checks
//!                                   │ Koopman CRC-32 over payload
//! Message::encode ──► Parcel::new ──► ParcelCodec::encode ──► WireWriter ──► socket
//! ```
//!
//! - `domain` - `Parcel`, `ParcelHeader`, `ParcelCommand`, checksum table, errors
//! - `ports` - `ChecksumProvider`
//! - `service` - `ParcelCodec`
//! - `adapters` - `KoopmanChecksum`, `WireTransport` and its split halves
//!
//! ## Deadlines
//!
//! Every send and receive runs under its own deadline from
//! [`TransportConfig`]. A zero or already-elapsed deadline fails at once
//! with [`TransportError::Timeout`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{
    CloseHandle, KoopmanChecksum, TransportConfig, WireReader, WireTransport, WireWriter,
};
pub use domain::{
    koopman_crc32, Parcel, ParcelCommand, ParcelError, ParcelHeader, ParcelResult,
    TransportError, TransportResult, MAX_PARCEL_LEN, MAX_PAYLOAD, MIN_PARCEL_LEN,
};
pub use ports::ChecksumProvider;
pub use service::ParcelCodec;
