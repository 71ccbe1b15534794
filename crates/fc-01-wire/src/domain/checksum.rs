//! # Koopman CRC-32
//!
//! Payload integrity checksum carried in every parcel header. Uses the
//! reflected Koopman polynomial rather than the IEEE one; both ends of a
//! connection must agree on the table or every parcel fails verification.

/// Reflected form of the Koopman polynomial `0x741B8CD7`.
pub const KOOPMAN_POLY: u32 = 0xEB31_D82E;

/// Byte-wise lookup table, built at compile time.
pub static KOOPMAN_TABLE: [u32; 256] = build_table(KOOPMAN_POLY);

const fn build_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ poly } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 of `data` under the Koopman table.
#[must_use]
pub fn koopman_crc32(data: &[u8]) -> u32 {
    !data.iter().fold(!0u32, |crc, &byte| {
        KOOPMAN_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}
