//! Checksums used by sensor wire protocols

/// Sensirion CRC-8 (poly 0x31, init 0xFF, no final XOR)
///
/// Guards each 16-bit word read from SHT3x-family sensors.
pub fn sensirion_crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
