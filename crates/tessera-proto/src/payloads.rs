//! CBOR-encoded envelope payloads, one type per protocol phase.
//!
//! # Design Rationale
//!
//! The reference design reused one message shape with optional fields for
//! every phase, which meant "is this message well-formed?" could only be
//! answered at field-access time. Here each phase owns a variant carrying
//! exactly the fields valid for that phase; a structurally invalid message
//! cannot be constructed or decoded.
//!
//! ## Why CBOR?
//!
//! - **Forward Compatibility**: optional fields can be added without breaking
//!   old peers.
//! - **Type Safety**: CBOR preserves type information; there is no generic
//!   map parsing that could accept unexpected fields.
//! - **Bounded Deserialization**: payloads are validated against the 64 KiB
//!   envelope limit before CBOR parsing begins.
//!
//! ## No Variant Tag
//!
//! The opcode in the envelope header already identifies the payload type, so
//! the CBOR encodes only the inner struct. This prevents attackers from
//! sending mismatched opcode/payload pairs: decoding is driven by the opcode
//! alone.

use serde::{Deserialize, Serialize};

use crate::{
    Envelope, EnvelopeHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// Phase 1: device asks to authenticate.
///
/// The device generates the session id carried in the envelope header; the
/// payload names the device so the server can look up its provisioned vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInit {
    /// Provisioned device identifier
    pub device_id: String,
}

/// Phase 2: server challenges the device.
///
/// The challenge names `indices` into the device's key pool and a fresh
/// nonce. The device must respond with the HMAC of the XOR-combination of
/// the named keys mixed with the nonce.
///
/// # Security
///
/// - **Debug Redaction**: the `Debug` impl redacts `nonce`. Challenge nonces
///   are not secrets in the classic sense, but logging them invites
///   transcript reconstruction; no cryptographic material reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Device the challenge is addressed to
    pub device_id: String,
    /// Ordered key-pool indices to combine (sampled with replacement)
    pub indices: Vec<u32>,
    /// Fresh challenge nonce, one key length long
    pub nonce: Vec<u8>,
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenge")
            .field("device_id", &self.device_id)
            .field("indices", &self.indices)
            .field("nonce", &format!("<redacted {} bytes>", self.nonce.len()))
            .finish()
    }
}

/// Phase 3: device proves key possession.
///
/// `response` is the HMAC-derived proof; `nonce` is a fresh device-generated
/// value (distinct from the challenge nonce) that makes every phase-3
/// message unique on the wire even for an identical challenge.
///
/// # Security
///
/// - **Debug Redaction**: the `Debug` impl redacts both `response` and
///   `nonce` to keep derived secrets out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// Device answering the challenge
    pub device_id: String,
    /// HMAC over the XOR-combined challenged keys
    pub response: Vec<u8>,
    /// Fresh per-response device nonce (replay defense, additive to the
    /// challenge nonce)
    pub nonce: Vec<u8>,
}

impl std::fmt::Debug for ChallengeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeResponse")
            .field("device_id", &self.device_id)
            .field("response", &format!("<redacted {} bytes>", self.response.len()))
            .field("nonce", &format!("<redacted {} bytes>", self.nonce.len()))
            .finish()
    }
}

/// Phase 4: server's explicit accept/reject.
///
/// The reference protocol never told the device whether it passed; the
/// device state machine could not legitimately reach its authenticated
/// state. The verdict closes that gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the session authenticated successfully
    pub accepted: bool,
    /// Human-readable reason for a rejection
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

/// Server-side failure report.
///
/// Sent in place of a phase message when the server cannot process a
/// request. `retry_after_ms` carries the rate-limit backoff hint: a
/// rate-limited device should wait at least that long before re-initiating.
///
/// # Security
///
/// Error messages must not leak internal server detail. The `code` mirrors
/// the server's error taxonomy; the `message` is for operators, not parsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code from the authentication error taxonomy
    pub code: u16,
    /// Human-readable error message
    pub message: String,
    /// Optional backoff hint in milliseconds
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry_after_ms: Option<u64>,
}

/// All possible envelope payloads
///
/// # Invariants
///
/// - **Opcode Uniqueness**: each variant corresponds to exactly one
///   [`Opcode`]; [`Payload::opcode`] is a bijection over variants.
/// - **Serialization Consistency**: encoding a `Payload` and decoding it
///   with the same opcode produces an equivalent value (round-trip tested).
///
/// # Security
///
/// All methods use exhaustive `match`. Adding a variant breaks compilation
/// of `encode`, `decode`, and `opcode` until it is handled everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Phase 1: initiation
    AuthInit(AuthInit),
    /// Phase 2: challenge
    Challenge(Challenge),
    /// Phase 3: response
    ChallengeResponse(ChallengeResponse),
    /// Phase 4: accept/reject
    Verdict(Verdict),
    /// Failure report
    Error(ErrorReport),
}

impl Payload {
    /// The opcode corresponding to this payload variant.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::AuthInit(_) => Opcode::AuthInit,
            Self::Challenge(_) => Opcode::Challenge,
            Self::ChallengeResponse(_) => Opcode::ChallengeResponse,
            Self::Verdict(_) => Opcode::Verdict,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Short variant name, used in mismatch errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthInit(_) => "AuthInit",
            Self::Challenge(_) => "Challenge",
            Self::ChallengeResponse(_) => "ChallengeResponse",
            Self::Verdict(_) => "Verdict",
            Self::Error(_) => "Error",
        }
    }

    /// Encode the payload content as CBOR (no variant tag).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] on serialization failure.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let result = match self {
            Self::AuthInit(inner) => ciborium::ser::into_writer(inner, &mut buf),
            Self::Challenge(inner) => ciborium::ser::into_writer(inner, &mut buf),
            Self::ChallengeResponse(inner) => ciborium::ser::into_writer(inner, &mut buf),
            Self::Verdict(inner) => ciborium::ser::into_writer(inner, &mut buf),
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut buf),
        };
        result.map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode payload bytes according to the given opcode.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborDecode`] if the bytes are not a valid
    /// encoding of the payload type the opcode demands.
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        let decode_err = |e: ciborium::de::Error<std::io::Error>| {
            ProtocolError::CborDecode(e.to_string())
        };
        match opcode {
            Opcode::AuthInit => {
                Ok(Self::AuthInit(ciborium::de::from_reader(bytes).map_err(decode_err)?))
            },
            Opcode::Challenge => {
                Ok(Self::Challenge(ciborium::de::from_reader(bytes).map_err(decode_err)?))
            },
            Opcode::ChallengeResponse => Ok(Self::ChallengeResponse(
                ciborium::de::from_reader(bytes).map_err(decode_err)?,
            )),
            Opcode::Verdict => {
                Ok(Self::Verdict(ciborium::de::from_reader(bytes).map_err(decode_err)?))
            },
            Opcode::Error => {
                Ok(Self::Error(ciborium::de::from_reader(bytes).map_err(decode_err)?))
            },
        }
    }

    /// Wrap this payload in an envelope addressed to `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if CBOR encoding fails or the payload exceeds the
    /// envelope size limit.
    pub fn into_envelope(self, session_id: [u8; 16]) -> Result<Envelope> {
        let header = EnvelopeHeader::new(self.opcode(), session_id);
        let bytes = self.encode()?;
        Envelope::new(header, bytes)
    }

    /// Extract and decode the payload from an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidOpcode`] for unknown opcodes, or a
    /// CBOR error if the payload does not match the opcode's schema.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let opcode = envelope
            .header
            .opcode_enum()
            .ok_or(ProtocolError::InvalidOpcode(envelope.header.opcode_raw()))?;
        Self::decode(opcode, &envelope.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_round_trip() {
        let payload = Payload::Challenge(Challenge {
            device_id: "dev_0".to_string(),
            indices: vec![2, 5, 9],
            nonce: vec![0u8; 16],
        });

        let bytes = payload.encode().expect("encode");
        let decoded = Payload::decode(Opcode::Challenge, &bytes).expect("decode");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn opcode_payload_mismatch_fails_decode() {
        let payload = Payload::Verdict(Verdict { accepted: true, reason: None });
        let bytes = payload.encode().expect("encode");

        // A verdict body does not satisfy the Challenge schema.
        assert!(Payload::decode(Opcode::Challenge, &bytes).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let response = ChallengeResponse {
            device_id: "dev_1".to_string(),
            response: vec![0xAA; 32],
            nonce: vec![0xBB; 32],
        };
        let rendered = format!("{response:?}");
        assert!(!rendered.contains("aa"));
        assert!(!rendered.contains("170"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn verdict_reason_is_optional_on_the_wire() {
        let accept = Payload::Verdict(Verdict { accepted: true, reason: None });
        let reject = Payload::Verdict(Verdict {
            accepted: false,
            reason: Some("response mismatch".to_string()),
        });

        let accept_bytes = accept.encode().expect("encode");
        let reject_bytes = reject.encode().expect("encode");
        assert!(accept_bytes.len() < reject_bytes.len());

        assert_eq!(Payload::decode(Opcode::Verdict, &accept_bytes).expect("decode"), accept);
        assert_eq!(Payload::decode(Opcode::Verdict, &reject_bytes).expect("decode"), reject);
    }
}
