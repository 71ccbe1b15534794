//! Adapters implementing the signer/verifier ports.

pub mod ed25519;
pub mod keyfile;

pub use ed25519::{Ed25519Signer, Ed25519Verifier};
pub use keyfile::{load_key, load_or_create_key};
