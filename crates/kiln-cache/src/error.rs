//! Cache format errors

use thiserror::Error;

/// Errors that can occur while reading or patching a cache buffer
#[derive(Debug, Error)]
pub enum CacheError {
    /// Buffer is too short to hold the requested header field
    #[error("Invalid cache buffer: need at least {needed} bytes, got {actual}")]
    InvalidBuffer {
        /// Minimum length required
        needed: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// Engine version string could not be parsed
    #[error("Invalid engine version: {0}")]
    InvalidVersion(String),

    /// Byte span is empty, inverted, or overlaps the source length field
    #[error("Invalid byte span {start}..{end}")]
    InvalidSpan {
        /// Span start (inclusive)
        start: usize,
        /// Span end (exclusive)
        end: usize,
    },

    /// The reference compile needed for patching failed
    #[error("Reference compile failed: {0}")]
    Reference(String),
}

impl CacheError {
    /// Create an invalid buffer error
    pub fn too_short(needed: usize, actual: usize) -> Self {
        Self::InvalidBuffer { needed, actual }
    }

    /// Create a reference error
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;
