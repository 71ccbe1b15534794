//! # Ports
//!
//! Outbound dependency of the parcel codec.

/// Payload integrity checksum.
pub trait ChecksumProvider: Send + Sync {
    fn compute(&self, data: &[u8]) -> u32;

    fn verify(&self, data: &[u8], expected: u32) -> bool {
        self.compute(data) == expected
    }
}
