//! Domain layer: parcel model, checksum algorithm, errors.

pub mod checksum;
pub mod errors;
pub mod parcel;

pub use checksum::{koopman_crc32, KOOPMAN_POLY, KOOPMAN_TABLE};
pub use errors::{ParcelError, ParcelResult, TransportError, TransportResult};
pub use parcel::{
    Parcel, ParcelCommand, ParcelHeader, MAX_HEADER_STRINGS, MAX_PARCEL_LEN, MAX_PAYLOAD,
    MIN_PARCEL_LEN, PARCEL_FIXED_LEN,
};
