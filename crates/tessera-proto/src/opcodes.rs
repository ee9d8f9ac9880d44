//! Operation codes for Tessera envelopes.
//!
//! One opcode per protocol phase, plus an error frame. The opcode in the
//! envelope header determines how the CBOR payload is interpreted, so the
//! mapping must stay stable across versions.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Envelope operation codes
///
/// # Representation
///
/// Opcodes are serialized as Big Endian `u16` values in the envelope header.
/// The `#[repr(u16)]` ensures stable numeric values for wire compatibility.
///
/// # Security
///
/// - **Unknown Opcodes**: [`Opcode::from_u16`] returns `None` for unknown
///   values rather than panicking. Envelopes with unknown opcodes must be
///   rejected with
///   [`ProtocolError::InvalidOpcode`](crate::ProtocolError::InvalidOpcode).
///
/// - **No Implicit Behavior**: Each opcode is explicitly handled; there is no
///   default interpretation for unexpected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum Opcode {
    /// Phase 1: device initiates authentication
    AuthInit = 0x0001,
    /// Phase 2: server issues a key-pool challenge
    Challenge = 0x0002,
    /// Phase 3: device returns the derived response
    ChallengeResponse = 0x0003,
    /// Phase 4: server accepts or rejects the session
    Verdict = 0x0004,
    /// Server-side failure report (including rate-limit backoff)
    Error = 0x00FF,
}

impl Opcode {
    /// Convert a raw u16 into an opcode.
    ///
    /// Returns `None` for unknown values.
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::AuthInit),
            0x0002 => Some(Self::Challenge),
            0x0003 => Some(Self::ChallengeResponse),
            0x0004 => Some(Self::Verdict),
            0x00FF => Some(Self::Error),
            _ => None,
        }
    }

    /// Get the raw u16 value of this opcode.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}
