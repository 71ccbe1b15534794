//! # Shared Types Crate
//!
//! Primitive entities, codec helpers and shared errors used across the
//! FedChain subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem primitives are defined here.
//! - **Big-endian wire**: every binary format in the node goes through
//!   [`ByteReader`] / [`ByteWriter`].

pub mod codec;
pub mod entities;
pub mod errors;

pub use codec::{ByteReader, ByteWriter};
pub use entities::*;
pub use errors::*;
