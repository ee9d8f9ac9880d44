//! Envelope header implementation with zero-copy parsing.
//!
//! The `EnvelopeHeader` is a fixed 32-byte structure serialized as raw
//! binary (Big Endian). A server can read the opcode and session id straight
//! off the wire and route the envelope to its session record without
//! deserializing the CBOR payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 32-byte envelope header (Big Endian network byte order)
///
/// All multi-byte integers are stored in Big Endian format to match network
/// byte order. Fields are stored as raw byte arrays to avoid alignment
/// issues with `#[repr(C, packed)]`.
///
/// # Layout
///
/// | Bytes | Field | Purpose |
/// |---|---|---|
/// | 0-3 | magic | `"TSRA"` (0x54535241) |
/// | 4 | version | protocol version, currently 1 |
/// | 5 | reserved | must be zero |
/// | 6-7 | opcode | u16 operation code |
/// | 8-11 | payload_size | u32 payload length |
/// | 12-27 | session_id | 128-bit opaque session token |
/// | 28-31 | reserved | must be zero |
///
/// # Security Properties
///
/// - **Zero-Copy Safety**: The `#[repr(C, packed)]` layout with `zerocopy`
///   traits ensures this struct can be safely cast from untrusted network
///   bytes. All 32-byte patterns are valid (no invalid bit patterns), so
///   casting arbitrary bytes cannot cause undefined behavior.
///
/// - **Session Binding**: The `session_id` field lets the server look up the
///   session before parsing the payload, so an attacker cannot make the
///   server deserialize payloads for sessions that do not exist.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct EnvelopeHeader {
    magic: [u8; 4],
    version: u8,
    reserved0: u8,
    pub(crate) opcode: [u8; 2],
    pub(crate) payload_size: [u8; 4],
    session_id: [u8; 16],
    reserved1: [u8; 4],
}

impl EnvelopeHeader {
    /// Size of the serialized header (32 bytes)
    pub const SIZE: usize = 32;

    /// Magic number: "TSRA" in ASCII (0x54535241)
    pub const MAGIC: u32 = 0x5453_5241;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB)
    ///
    /// Authentication messages carry a handful of indices and two hash-sized
    /// byte strings. Anything approaching this limit is hostile input.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode and session id.
    #[must_use]
    pub fn new(opcode: Opcode, session_id: [u8; 16]) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            reserved0: 0,
            opcode: opcode.to_u16().to_be_bytes(),
            payload_size: [0; 4],
            session_id,
            reserved1: [0; 4],
        }
    }

    /// Parse a header from network bytes (zero-copy, safe).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if:
    /// - The buffer is too short (< 32 bytes)
    /// - The magic number is invalid
    /// - The protocol version is unsupported
    /// - The claimed payload size exceeds the maximum
    ///
    /// # Security
    ///
    /// Validation runs cheapest-first (size, magic) before version and
    /// payload-size checks, failing fast on garbage data. Structural
    /// validity only: a valid header proves nothing about the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::EnvelopeTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize the header to its 32-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Raw opcode value from the header.
    #[must_use]
    pub fn opcode_raw(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Opcode as an enum, if known.
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode_raw())
    }

    /// Claimed payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }

    /// The 128-bit session token this envelope belongs to.
    #[must_use]
    pub fn session_id(&self) -> [u8; 16] {
        self.session_id
    }
}

impl std::fmt::Debug for EnvelopeHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeHeader")
            .field("opcode", &format_args!("{:#06x}", self.opcode_raw()))
            .field("payload_size", &self.payload_size())
            .field("session_id", &format_args!("{:02x?}", self.session_id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = EnvelopeHeader::new(Opcode::Challenge, [7u8; 16]);
        let bytes = header.to_bytes();

        let parsed = EnvelopeHeader::from_bytes(&bytes).expect("valid header");
        assert_eq!(parsed.opcode_enum(), Some(Opcode::Challenge));
        assert_eq!(parsed.session_id(), [7u8; 16]);
        assert_eq!(parsed.payload_size(), 0);
    }

    #[test]
    fn parsed_header_equals_constructed() {
        let header = EnvelopeHeader::new(Opcode::Verdict, [0xAB; 16]);
        let parsed = *EnvelopeHeader::from_bytes(&header.to_bytes()).expect("valid header");
        assert_eq!(parsed, header);

        let other = EnvelopeHeader::new(Opcode::Verdict, [0xAC; 16]);
        assert_ne!(parsed, other);
    }

    #[test]
    fn short_buffer_rejected() {
        let err = EnvelopeHeader::from_bytes(&[0u8; 5]).unwrap_err();
        assert_eq!(err, ProtocolError::EnvelopeTooShort { expected: 32, actual: 5 });
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = EnvelopeHeader::new(Opcode::AuthInit, [0; 16]).to_bytes();
        bytes[0] = b'X';
        assert_eq!(EnvelopeHeader::from_bytes(&bytes).unwrap_err(), ProtocolError::InvalidMagic);
    }

    #[test]
    fn bad_version_rejected() {
        let mut bytes = EnvelopeHeader::new(Opcode::AuthInit, [0; 16]).to_bytes();
        bytes[4] = 0x42;
        assert_eq!(
            EnvelopeHeader::from_bytes(&bytes).unwrap_err(),
            ProtocolError::UnsupportedVersion(0x42)
        );
    }

    #[test]
    fn oversized_payload_claim_rejected() {
        let mut bytes = EnvelopeHeader::new(Opcode::AuthInit, [0; 16]).to_bytes();
        bytes[8..12].copy_from_slice(&(EnvelopeHeader::MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        assert!(matches!(
            EnvelopeHeader::from_bytes(&bytes).unwrap_err(),
            ProtocolError::PayloadTooLarge { .. }
        ));
    }
}
