//! Error types for the Tessera wire format.
//!
//! All errors are structured, testable, and provide actionable information.

use thiserror::Error;

/// Protocol-level errors that can occur during envelope parsing and
/// validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Envelope is shorter than the fixed header size
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort {
        /// Expected minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Invalid magic number in envelope header
    #[error("invalid magic number: expected 0x54535241 (\"TSRA\")")]
    InvalidMagic,

    /// Unsupported protocol version
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds maximum allowed size
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Envelope is truncated (header claims more data than available)
    #[error("envelope truncated: header claims {expected} payload bytes, but only {actual} available")]
    EnvelopeTruncated {
        /// Expected payload size from header
        expected: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Failed to encode a payload as CBOR
    #[error("failed to encode CBOR: {0}")]
    CborEncode(String),

    /// Failed to decode CBOR payload data
    #[error("failed to decode CBOR: {0}")]
    CborDecode(String),

    /// Invalid or unknown opcode
    #[error("invalid opcode: {0:#06x}")]
    InvalidOpcode(u16),
}

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_context() {
        let err = ProtocolError::EnvelopeTooShort { expected: 32, actual: 7 };
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains('7'));

        let err = ProtocolError::InvalidOpcode(0xBEEF);
        assert!(err.to_string().contains("0xbeef"));
    }
}
