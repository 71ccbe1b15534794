//! # Signing Service
//!
//! Signs outgoing authenticated messages and verifies signatures on incoming
//! ones. Messages hold a [`SignatureBlock`]; whether the signer is an
//! authority is decided by the ledger, not here.
//!
//! ## Architecture
//!
//! - `domain` - `SignatureBlock` wire type and errors
//! - `ports` - `MessageSigner` / `SignatureVerifier`
//! - `adapters` - Ed25519 implementation and key-file persistence

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{load_key, load_or_create_key, Ed25519Signer, Ed25519Verifier};
pub use domain::{SignatureBlock, SignatureError};
pub use ports::{MessageSigner, SignatureVerifier};
