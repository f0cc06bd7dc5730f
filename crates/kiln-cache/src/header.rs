//! Cache header codec

use serde::Serialize;

use crate::error::{CacheError, CacheResult};

/// Offset of the little-endian source length field
pub const SOURCE_LENGTH_OFFSET: usize = 8;

/// Offset of the first build fingerprint byte
pub const FINGERPRINT_OFFSET: usize = 12;

/// Smallest buffer that still carries a source length
pub const HEADER_MIN_LEN: usize = SOURCE_LENGTH_OFFSET + 4;

/// End of the widest fingerprint region any known layout patches
pub const FINGERPRINT_END: usize = 20;

/// Read the declared source length (bytes 8..12, little-endian).
///
/// The value is the engine length of the exact string that was compiled,
/// which is what the placeholder source has to match at load time.
pub fn decode_source_length(buffer: &[u8]) -> CacheResult<u32> {
    match buffer.get(SOURCE_LENGTH_OFFSET..HEADER_MIN_LEN) {
        Some(&[b0, b1, b2, b3]) => Ok(u32::from_le_bytes([b0, b1, b2, b3])),
        _ => Err(CacheError::too_short(HEADER_MIN_LEN, buffer.len())),
    }
}

/// Write the declared source length into bytes 8..12.
pub fn encode_source_length(buffer: &mut [u8], len: u32) -> CacheResult<()> {
    let actual = buffer.len();
    let field = buffer
        .get_mut(SOURCE_LENGTH_OFFSET..HEADER_MIN_LEN)
        .ok_or(CacheError::too_short(HEADER_MIN_LEN, actual))?;
    field.copy_from_slice(&len.to_le_bytes());
    Ok(())
}

/// Decoded view of the header fields kiln understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheHeader {
    /// Declared source length
    pub source_length: u32,
    /// Fingerprint bytes (12..20, truncated for short buffers)
    pub fingerprint: Vec<u8>,
    /// Total buffer size in bytes
    pub total_len: usize,
}

impl CacheHeader {
    /// Parse the header of a cache buffer
    pub fn parse(buffer: &[u8]) -> CacheResult<Self> {
        let source_length = decode_source_length(buffer)?;
        let end = buffer.len().min(FINGERPRINT_END);
        let fingerprint = buffer
            .get(FINGERPRINT_OFFSET..end)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Ok(Self {
            source_length,
            fingerprint,
            total_len: buffer.len(),
        })
    }

    /// Fingerprint as lowercase hex, grouped by 4-byte words
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint
            .chunks(4)
            .map(|word| word.iter().map(|b| format!("{:02x}", b)).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
