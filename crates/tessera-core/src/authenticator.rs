//! Device-side authentication state machine.
//!
//! This module implements the device half of the four-phase exchange:
//! initiate, receive challenge, respond, receive verdict.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ initiate ┌─────────────┐ handle_challenge ┌───────────────┐
//! │ Init │─────────>│ AuthStarted │─────────────────>│ ChallengeSent │
//! └──────┘          └─────────────┘                  └───────────────┘
//!                                                       │          │
//!                                      verdict(accept)  │          │ verdict(reject)
//!                                                       ↓          ↓
//!                                            ┌───────────────┐ ┌────────┐
//!                                            │ Authenticated │ │ Failed │
//!                                            └───────────────┘ └────────┘
//! ```
//!
//! Transitions are monotonic within a session. `initiate` is the one
//! exception: it may be called from any state and abandons the previous
//! session, because a constrained device that lost a verdict has no better
//! option than to start over.
//!
//! # Design
//!
//! This is a pure state machine: no I/O, no stored clock. Entropy comes
//! through the [`Environment`] parameter; methods consume and produce
//! [`Message`] values and the driver moves them over whatever transport
//! exists.

use tessera_proto::{
    Message, Payload, SessionId,
    payloads::{AuthInit, ChallengeResponse},
};

use crate::{
    env::Environment,
    error::AuthError,
    vault::{RESPONSE_LEN, Vault, session_transcript},
};

/// Length of the fresh per-response device nonce in bytes.
const DEVICE_NONCE_LEN: usize = 32;

/// Device-side authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No session in progress
    Init,
    /// Phase-1 message produced, waiting for a challenge
    AuthStarted,
    /// Response produced, waiting for the verdict
    ChallengeSent,
    /// Server accepted the response
    Authenticated,
    /// Server rejected the response (or the session otherwise died)
    Failed,
}

/// Per-session context the device must remember between phases.
#[derive(Debug, Clone)]
struct SessionContext {
    session_id: SessionId,
    challenge_nonce: Option<Vec<u8>>,
    response: Option<[u8; RESPONSE_LEN]>,
}

/// Device-side authenticator: owns the device vault and drives the session
/// from initiation to verdict.
#[derive(Debug)]
pub struct Authenticator {
    device_id: Option<String>,
    state: AuthState,
    vault: Vault,
    session: Option<SessionContext>,
}

impl Authenticator {
    /// Create an authenticator around a provisioned vault.
    ///
    /// The device identity starts unset; [`Authenticator::set_device_id`]
    /// must be called before [`Authenticator::initiate`].
    #[must_use]
    pub fn new(vault: Vault) -> Self {
        Self { device_id: None, state: AuthState::Init, vault, session: None }
    }

    /// Set the provisioned device identity.
    pub fn set_device_id(&mut self, device_id: impl Into<String>) {
        self.device_id = Some(device_id.into());
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Session id of the in-progress session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.session_id)
    }

    /// Read access to the device vault (for provisioning-time mirroring and
    /// sync audits).
    #[must_use]
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Start a new authentication session.
    ///
    /// Generates a fresh session id, transitions to
    /// [`AuthState::AuthStarted`], and returns the phase-1 message. Any
    /// previous session context is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingIdentity`] if no device id is set.
    pub fn initiate<E: Environment>(&mut self, env: &E) -> Result<Message, AuthError> {
        let device_id = self.device_id.clone().ok_or(AuthError::MissingIdentity)?;

        let mut id_bytes = [0u8; 16];
        env.random_bytes(&mut id_bytes);
        let session_id = SessionId::from_bytes(id_bytes);

        self.session =
            Some(SessionContext { session_id, challenge_nonce: None, response: None });
        self.state = AuthState::AuthStarted;

        Ok(Message::new(session_id, Payload::AuthInit(AuthInit { device_id })))
    }

    /// Answer a challenge.
    ///
    /// Valid only from [`AuthState::AuthStarted`]. Computes the response
    /// through the vault, remembers the challenge nonce and response for
    /// the rotation transcript, and returns the phase-3 message carrying a
    /// fresh device nonce.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidState`] outside `AuthStarted`
    /// - [`AuthError::UnknownSession`] if the message names a different
    ///   session than the one in progress
    /// - [`AuthError::UnexpectedMessage`] if the payload is not a challenge
    /// - [`AuthError::Vault`] if response derivation fails (an out-of-range
    ///   index, or a fatal integrity error)
    pub fn handle_challenge<E: Environment>(
        &mut self,
        env: &E,
        message: &Message,
    ) -> Result<Message, AuthError> {
        if self.state != AuthState::AuthStarted {
            return Err(AuthError::InvalidState {
                state: format!("{:?}", self.state),
                operation: "handle challenge",
            });
        }

        let session = self.session.as_mut().expect("AuthStarted implies a session context");
        if message.session_id != session.session_id {
            return Err(AuthError::UnknownSession { session_id: message.session_id });
        }

        let Payload::Challenge(challenge) = &message.payload else {
            return Err(AuthError::UnexpectedMessage {
                opcode: message.payload.opcode().to_u16(),
            });
        };

        let response = self.vault.compute_response(&challenge.indices, &challenge.nonce)?;
        session.challenge_nonce = Some(challenge.nonce.clone());
        session.response = Some(response);
        self.state = AuthState::ChallengeSent;

        let mut device_nonce = vec![0u8; DEVICE_NONCE_LEN];
        env.random_bytes(&mut device_nonce);

        let device_id = self.device_id.clone().ok_or(AuthError::MissingIdentity)?;
        Ok(Message::new(
            session.session_id,
            Payload::ChallengeResponse(ChallengeResponse {
                device_id,
                response: response.to_vec(),
                nonce: device_nonce,
            }),
        ))
    }

    /// Process the server's explicit accept/reject.
    ///
    /// Valid only from [`AuthState::ChallengeSent`]. On acceptance the
    /// device rotates its vault with the session transcript and reaches
    /// [`AuthState::Authenticated`]; on rejection it reaches
    /// [`AuthState::Failed`] without rotating (the server did not rotate
    /// its mirror either, so the pools stay aligned).
    ///
    /// Returns whether the session was accepted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidState`] outside `ChallengeSent`
    /// - [`AuthError::UnknownSession`] on a session-id mismatch
    /// - [`AuthError::UnexpectedMessage`] if the payload is not a verdict
    /// - [`AuthError::Vault`] if rotation fails (fatal)
    pub fn handle_verdict<E: Environment>(
        &mut self,
        env: &E,
        message: &Message,
    ) -> Result<bool, AuthError> {
        if self.state != AuthState::ChallengeSent {
            return Err(AuthError::InvalidState {
                state: format!("{:?}", self.state),
                operation: "handle verdict",
            });
        }

        let session = self.session.as_ref().expect("ChallengeSent implies a session context");
        if message.session_id != session.session_id {
            return Err(AuthError::UnknownSession { session_id: message.session_id });
        }

        let Payload::Verdict(verdict) = &message.payload else {
            return Err(AuthError::UnexpectedMessage {
                opcode: message.payload.opcode().to_u16(),
            });
        };

        if verdict.accepted {
            let nonce = session
                .challenge_nonce
                .as_ref()
                .expect("ChallengeSent implies a stored challenge nonce");
            let response =
                session.response.as_ref().expect("ChallengeSent implies a stored response");
            let transcript = session_transcript(&session.session_id, nonce, response);
            self.vault.rotate(env, &transcript)?;
            self.state = AuthState::Authenticated;
            Ok(true)
        } else {
            self.state = AuthState::Failed;
            Ok(false)
        }
    }
}
