//! Envelope type combining header and payload bytes.
//!
//! An `Envelope` is the transport-layer packet: a 32-byte raw binary header
//! followed by a variable-length CBOR payload. It is a pure data holder; for
//! typed access see [`Payload::into_envelope`](crate::Payload::into_envelope)
//! and [`Payload::from_envelope`](crate::Payload::from_envelope).

use bytes::Bytes;

use crate::{
    EnvelopeHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol envelope (transport layer)
///
/// Layout on the wire:
/// `[EnvelopeHeader: 32 bytes, raw binary] + [payload: variable bytes]`
///
/// This type holds raw payload bytes, NOT the `Payload` enum, so a server
/// can route an envelope by header alone.
///
/// # Invariants
///
/// - **Size Consistency**: `payload.len()` always matches
///   `header.payload_size()`. Enforced by [`Envelope::new`] and verified by
///   [`Envelope::decode`].
/// - **Size Limit**: `payload.len()` never exceeds
///   [`EnvelopeHeader::MAX_PAYLOAD_SIZE`].
///
/// # Security
///
/// Structural validity only: a decoded envelope has a well-formed header and
/// a size-consistent payload. It says nothing about whether the payload is
/// valid CBOR or whether the response inside it verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope header (32 bytes)
    pub header: EnvelopeHeader,
    /// Raw payload bytes (already CBOR-encoded)
    pub payload: Bytes,
}

impl Envelope {
    /// Create a new envelope, fixing up the header's payload size.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if the payload exceeds
    /// [`EnvelopeHeader::MAX_PAYLOAD_SIZE`].
    pub fn new(mut header: EnvelopeHeader, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        if payload.len() > EnvelopeHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: EnvelopeHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        // Payload length fits in u32 per the check above.
        header.payload_size = (payload.len() as u32).to_be_bytes();

        Ok(Self { header, payload })
    }

    /// Encode the envelope into a byte vector.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EnvelopeHeader::SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode an envelope from wire bytes.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` if the header is invalid or the buffer does
    /// not contain exactly the payload bytes the header claims.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = *EnvelopeHeader::from_bytes(bytes)?;
        let claimed = header.payload_size() as usize;
        let available = bytes.len() - EnvelopeHeader::SIZE;

        if available < claimed {
            return Err(ProtocolError::EnvelopeTruncated {
                expected: claimed,
                actual: available,
            });
        }

        let payload = Bytes::copy_from_slice(
            &bytes[EnvelopeHeader::SIZE..EnvelopeHeader::SIZE + claimed],
        );
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;

    #[test]
    fn encode_decode_round_trip() {
        let header = EnvelopeHeader::new(Opcode::ChallengeResponse, [3u8; 16]);
        let envelope = Envelope::new(header, vec![1, 2, 3, 4]).expect("envelope");

        let wire = envelope.encode();
        assert_eq!(wire.len(), EnvelopeHeader::SIZE + 4);

        let decoded = Envelope::decode(&wire).expect("decode");
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.header.payload_size(), 4);
    }

    #[test]
    fn truncated_envelope_rejected() {
        let header = EnvelopeHeader::new(Opcode::AuthInit, [0u8; 16]);
        let envelope = Envelope::new(header, vec![9u8; 64]).expect("envelope");

        let mut wire = envelope.encode();
        wire.truncate(wire.len() - 10);

        assert_eq!(
            Envelope::decode(&wire).unwrap_err(),
            ProtocolError::EnvelopeTruncated { expected: 64, actual: 54 }
        );
    }

    #[test]
    fn oversized_payload_rejected_at_construction() {
        let header = EnvelopeHeader::new(Opcode::AuthInit, [0u8; 16]);
        let huge = vec![0u8; EnvelopeHeader::MAX_PAYLOAD_SIZE as usize + 1];
        assert!(matches!(
            Envelope::new(header, huge).unwrap_err(),
            ProtocolError::PayloadTooLarge { .. }
        ));
    }
}
