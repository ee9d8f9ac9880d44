//! High-level protocol message: session id plus typed payload.
//!
//! The state machines on both sides exchange [`Message`] values; the
//! envelope layer is only involved when a message crosses the (simulated)
//! wire.

use serde::{Deserialize, Serialize};

use crate::{Envelope, Payload, errors::Result};

/// Opaque 128-bit session token.
///
/// Generated by the device at initiation and echoed by every subsequent
/// message of the session. Displayed as lowercase hex for logs and error
/// messages; the raw bytes never carry meaning.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Construct a session id from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw 16 bytes of the token.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({self})")
    }
}

/// One protocol message: a session id and a phase payload.
///
/// # Invariants
///
/// - The session id in the envelope header and the message are the same
///   value; [`Message::encode`]/[`Message::decode`] maintain this by
///   construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Session this message belongs to
    pub session_id: SessionId,
    /// Phase payload
    pub payload: Payload,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(session_id: SessionId, payload: Payload) -> Self {
        Self { session_id, payload }
    }

    /// Encode to wire bytes (header + CBOR payload).
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` if CBOR encoding fails or the payload is
    /// oversized.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let envelope = self.payload.clone().into_envelope(*self.session_id.as_bytes())?;
        Ok(envelope.encode())
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` if the envelope is malformed, the opcode is
    /// unknown, or the payload does not match the opcode's schema.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope = Envelope::decode(bytes)?;
        let payload = Payload::from_envelope(&envelope)?;
        Ok(Self {
            session_id: SessionId::from_bytes(envelope.header.session_id()),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{AuthInit, Verdict};

    #[test]
    fn session_id_displays_as_hex() {
        let id = SessionId::from_bytes([
            0x00, 0x01, 0x02, 0x03, 0xAA, 0xBB, 0xCC, 0xDD, 0x10, 0x20, 0x30, 0x40, 0xDE, 0xAD,
            0xBE, 0xEF,
        ]);
        assert_eq!(id.to_string(), "00010203aabbccdd10203040deadbeef");
    }

    #[test]
    fn message_round_trip_preserves_session_binding() {
        let message = Message::new(
            SessionId::from_bytes([0x42; 16]),
            Payload::AuthInit(AuthInit { device_id: "dev_7".to_string() }),
        );

        let wire = message.encode().expect("encode");
        let decoded = Message::decode(&wire).expect("decode");
        assert_eq!(decoded, message);
    }

    #[test]
    fn verdict_messages_round_trip() {
        let message = Message::new(
            SessionId::from_bytes([1; 16]),
            Payload::Verdict(Verdict { accepted: false, reason: Some("expired".into()) }),
        );
        let decoded = Message::decode(&message.encode().expect("encode")).expect("decode");
        assert_eq!(decoded, message);
    }
}
