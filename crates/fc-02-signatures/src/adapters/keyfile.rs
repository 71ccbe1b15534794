//! # Key File
//!
//! The identity key is stored as a hex-encoded 32-byte seed on a single line.

use super::ed25519::Ed25519Signer;
use crate::domain::SignatureError;
use std::fs;
use std::path::Path;
use tracing::info;

/// Load the key at `path`, creating a fresh one if the file is absent.
pub fn load_or_create_key(path: &Path) -> Result<Ed25519Signer, SignatureError> {
    if path.exists() {
        return load_key(path);
    }

    let signer = Ed25519Signer::generate();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SignatureError::KeyFileIo(e.to_string()))?;
    }
    fs::write(path, hex::encode(signer.to_seed()))
        .map_err(|e| SignatureError::KeyFileIo(e.to_string()))?;
    info!(path = %path.display(), "Generated new identity key");
    Ok(signer)
}

/// Load an existing key.
pub fn load_key(path: &Path) -> Result<Ed25519Signer, SignatureError> {
    let contents =
        fs::read_to_string(path).map_err(|e| SignatureError::KeyFileIo(e.to_string()))?;
    let bytes = hex::decode(contents.trim())
        .map_err(|e| SignatureError::MalformedKeyFile(e.to_string()))?;
    let seed: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        SignatureError::MalformedKeyFile(format!("expected 32 bytes, got {}", v.len()))
    })?;
    Ok(Ed25519Signer::from_seed(seed))
}
