//! Error types for the Tessera protocol core.
//!
//! Two layers of errors:
//! - [`VaultError`]: cryptographic/key-pool failures. Decryption and length
//!   failures indicate corruption or tampering at rest and are fatal to the
//!   affected vault instance.
//! - [`AuthError`]: protocol state-machine and session errors. Most are
//!   recoverable at the caller (drop the session, retry from phase 1).

use std::time::Duration;

use tessera_proto::{ProtocolError, SessionId};
use thiserror::Error;

/// Errors from vault key-pool operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A challenge named an index outside the key pool
    #[error("challenge index {index} out of range for pool of {pool_size} keys")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Number of keys in the pool
        pool_size: usize,
    },

    /// Key or nonce lengths disagree during the XOR fold
    #[error("length mismatch in key combination: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// A challenge named no indices at all
    #[error("challenge names no key indices")]
    EmptyChallenge,

    /// At-rest unprotection of a key failed
    ///
    /// This means the sealed pool does not authenticate under the master
    /// secret: corruption or tampering at rest. The vault must not be used
    /// further.
    #[error("failed to decrypt key material at rest")]
    DecryptionFailure,
}

/// Errors from the authentication protocol state machines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The device has no identity configured
    #[error("device identity not set")]
    MissingIdentity,

    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state}")]
    InvalidState {
        /// State the machine was in
        state: String,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Received a payload that does not belong to the current phase
    #[error("unexpected message: opcode {opcode:#06x} not valid here")]
    UnexpectedMessage {
        /// Opcode of the offending payload
        opcode: u16,
    },

    /// The device is not provisioned with this server
    #[error("unauthorized device: {device_id}")]
    UnauthorizedDevice {
        /// Identifier the device presented
        device_id: String,
    },

    /// No live session with this id (never issued, or expired)
    #[error("unknown session: {session_id}")]
    UnknownSession {
        /// Session id that failed lookup
        session_id: SessionId,
    },

    /// A live session already exists under this id
    #[error("duplicate session: {session_id}")]
    DuplicateSession {
        /// Session id that is already occupied
        session_id: SessionId,
    },

    /// The response does not match the independently computed expectation
    ///
    /// An expected, non-fatal outcome: authentication failed. Always logged
    /// and counted; never silently retried without a fresh challenge.
    #[error("response does not match expected value")]
    ResponseMismatch,

    /// Too many requests in the rate-limit window
    ///
    /// Returned, never thrown as fatal, so callers can back off gracefully.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited {
        /// How long the caller should wait before retrying
        retry_after: Duration,
    },

    /// Vault failure while computing or verifying
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Wire-format failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl AuthError {
    /// Returns true if this error is fatal to the vault that produced it.
    ///
    /// Cryptographic integrity errors mean possible corruption or tampering
    /// at rest; continuing to use the affected vault would be unsound.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Vault(VaultError::DecryptionFailure | VaultError::LengthMismatch { .. })
        )
    }

    /// Returns true if the caller may drop the session and retry from
    /// phase 1.
    ///
    /// State-machine and lookup errors are recoverable; a fresh session
    /// starts from a clean slate. `ResponseMismatch` is deliberately not
    /// "recoverable": it is a terminal authentication outcome, and retrying
    /// requires a fresh challenge anyway.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentity
                | Self::InvalidState { .. }
                | Self::UnexpectedMessage { .. }
                | Self::UnauthorizedDevice { .. }
                | Self::UnknownSession { .. }
                | Self::DuplicateSession { .. }
        )
    }

    /// Stable numeric code for wire-level error reports.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::MissingIdentity => 1,
            Self::InvalidState { .. } => 2,
            Self::UnexpectedMessage { .. } => 3,
            Self::UnauthorizedDevice { .. } => 4,
            Self::UnknownSession { .. } => 5,
            Self::DuplicateSession { .. } => 6,
            Self::ResponseMismatch => 7,
            Self::RateLimited { .. } => 8,
            Self::Vault(_) => 9,
            Self::Protocol(_) => 10,
        }
    }
}
