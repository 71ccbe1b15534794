use crate::domain::koopman_crc32;
use crate::ports::ChecksumProvider;

/// Koopman CRC-32, the checksum every peer on the network expects.
#[derive(Debug, Default, Clone, Copy)]
pub struct KoopmanChecksum;

impl ChecksumProvider for KoopmanChecksum {
    fn compute(&self, data: &[u8]) -> u32 {
        koopman_crc32(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_provider() {
        let provider = KoopmanChecksum;
        let crc = provider.compute(b"123456789");
        assert_eq!(crc, 0x2D3D_D0AE);
        assert!(provider.verify(b"123456789", crc));
        assert!(!provider.verify(b"123456780", crc));
    }
}
