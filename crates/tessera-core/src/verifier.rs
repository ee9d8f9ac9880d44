//! Server-side session manager and response validation.
//!
//! The verifier owns the server's mirror vault for every provisioned
//! device and a session table keyed by session id. It issues challenges,
//! validates responses in constant time, and rotates the matching mirror
//! on every accepted session so the two vaults stay aligned.
//!
//! # Session Lifecycle
//!
//! ```text
//! AuthInit ──> ChallengeIssued ──> Accepted (mirror rotated)
//!                    │
//!                    └──────────> Rejected (no rotation)
//! ```
//!
//! Sessions expire: a challenge left unanswered past the session TTL is
//! swept, and decided sessions are retained only briefly so a late
//! duplicate response maps to [`AuthError::UnknownSession`] rather than a
//! replayable verdict.
//!
//! # Security
//!
//! - Responses are compared with [`responses_match`] (constant-time)
//! - The expected response is computed at challenge-issue time and the
//!   challenge parameters are not kept beyond the session
//! - Admission is gated by a sliding-window rate limiter before any
//!   session state is touched

use std::collections::HashMap;
use std::time::Duration;

use tessera_proto::{
    Message, Payload, SessionId,
    payloads::{Challenge, ErrorReport, Verdict},
};

use crate::{
    env::Environment,
    error::AuthError,
    ratelimit::{Admission, RequestWindow},
    vault::{RESPONSE_LEN, Vault, responses_match, session_transcript},
};

/// Tunable verifier parameters.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Number of key indices per challenge
    pub challenge_size: usize,
    /// How long an unanswered challenge stays valid
    pub session_ttl: Duration,
    /// How long a decided session lingers before sweeping
    pub verdict_retention: Duration,
    /// Rate-limit window width
    pub window: Duration,
    /// Admissions per rate-limit window
    pub window_cap: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            challenge_size: 3,
            session_ttl: Duration::from_secs(30),
            verdict_retention: Duration::from_secs(5),
            window: crate::ratelimit::DEFAULT_WINDOW,
            window_cap: crate::ratelimit::DEFAULT_CAP,
        }
    }
}

/// Where a session stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Challenge sent, response outstanding
    ChallengeIssued,
    /// Response matched; mirror rotated
    Accepted,
    /// Response did not match; no rotation
    Rejected,
}

#[derive(Debug, Clone)]
struct Session<I> {
    device_id: String,
    challenge_nonce: Vec<u8>,
    expected: [u8; RESPONSE_LEN],
    issued_at: I,
    state: SessionState,
    decided_at: Option<I>,
}

/// Server-side verifier: device registry, session table, rate limiter.
#[derive(Debug)]
pub struct Verifier<E: Environment> {
    config: VerifierConfig,
    devices: HashMap<String, Vault>,
    sessions: HashMap<SessionId, Session<E::Instant>>,
    window: RequestWindow<E::Instant>,
}

impl<E: Environment> Verifier<E> {
    /// Create a verifier with the given configuration.
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        let window = RequestWindow::new(config.window, config.window_cap);
        Self { config, devices: HashMap::new(), sessions: HashMap::new(), window }
    }

    /// Provision a device: install the server-side mirror of its vault.
    ///
    /// Re-registering an id replaces the previous mirror.
    pub fn register_device(&mut self, device_id: impl Into<String>, vault: Vault) {
        let device_id = device_id.into();
        tracing::info!(device_id = %device_id, "device registered");
        self.devices.insert(device_id, vault);
    }

    /// Read access to a device's mirror vault (for sync audits).
    #[must_use]
    pub fn device_vault(&self, device_id: &str) -> Option<&Vault> {
        self.devices.get(device_id)
    }

    /// State of a session, if the table still holds it.
    #[must_use]
    pub fn session_state(&self, session_id: &SessionId) -> Option<SessionState> {
        self.sessions.get(session_id).map(|s| s.state)
    }

    /// Number of sessions currently in the table.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of challenges still awaiting a response.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.sessions.values().filter(|s| s.state == SessionState::ChallengeIssued).count()
    }

    /// Fingerprint of a device's mirror vault, for rotation-sync audits.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnauthorizedDevice`] if the device is not provisioned
    /// - [`AuthError::Vault`] if the sealed pool fails to decrypt
    pub fn device_fingerprint(&self, device_id: &str) -> Result<[u8; RESPONSE_LEN], AuthError> {
        let vault = self.devices.get(device_id).ok_or_else(|| {
            AuthError::UnauthorizedDevice { device_id: device_id.to_string() }
        })?;
        Ok(vault.fingerprint()?)
    }

    /// Sweep expired sessions outside of a phase call.
    ///
    /// Every phase handler sweeps on entry; drivers with long idle gaps can
    /// call this to reclaim the table eagerly.
    pub fn tick(&mut self, now: E::Instant) {
        self.sweep_expired(now);
    }

    /// Handle a phase-1 initiation: admit, look up the device, issue a
    /// challenge.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RateLimited`] if the admission window is full; no
    ///   session state is created or consulted
    /// - [`AuthError::UnexpectedMessage`] if the payload is not an
    ///   initiation
    /// - [`AuthError::UnauthorizedDevice`] if the device id is not
    ///   provisioned
    /// - [`AuthError::DuplicateSession`] if a challenge is already
    ///   outstanding under this session id
    pub fn handle_auth_init(&mut self, env: &E, message: &Message) -> Result<Message, AuthError> {
        let now = env.now();
        if let Admission::Rejected { retry_after } = self.window.try_admit(now) {
            tracing::warn!(session_id = %message.session_id, "request rejected by rate limiter");
            return Err(AuthError::RateLimited { retry_after });
        }
        self.sweep_expired(now);

        let Payload::AuthInit(init) = &message.payload else {
            return Err(AuthError::UnexpectedMessage {
                opcode: message.payload.opcode().to_u16(),
            });
        };

        let vault = self.devices.get(&init.device_id).ok_or_else(|| {
            AuthError::UnauthorizedDevice { device_id: init.device_id.clone() }
        })?;
        if self.sessions.contains_key(&message.session_id) {
            return Err(AuthError::DuplicateSession { session_id: message.session_id });
        }

        let (indices, nonce) = vault.generate_challenge(env, self.config.challenge_size);
        let expected = vault.compute_response(&indices, &nonce)?;

        self.sessions.insert(
            message.session_id,
            Session {
                device_id: init.device_id.clone(),
                challenge_nonce: nonce.clone(),
                expected,
                issued_at: now,
                state: SessionState::ChallengeIssued,
                decided_at: None,
            },
        );
        tracing::debug!(
            session_id = %message.session_id,
            device_id = %init.device_id,
            indices = indices.len(),
            "challenge issued"
        );

        Ok(Message::new(
            message.session_id,
            Payload::Challenge(Challenge { device_id: init.device_id.clone(), indices, nonce }),
        ))
    }

    /// Handle a phase-3 response: validate in constant time and decide.
    ///
    /// On a match the device's mirror vault rotates with the session
    /// transcript and the accept verdict is returned. On a mismatch the
    /// session is marked rejected and [`AuthError::ResponseMismatch`] is
    /// returned; the driver converts that into a reject verdict with
    /// [`Verifier::verdict_for_error`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnknownSession`] if the session was never issued,
    ///   expired, or is already decided
    /// - [`AuthError::UnexpectedMessage`] if the payload is not a response
    /// - [`AuthError::UnauthorizedDevice`] if the response names a
    ///   different device than the initiation did
    /// - [`AuthError::ResponseMismatch`] if validation fails
    /// - [`AuthError::Vault`] if mirror rotation fails (fatal)
    pub fn handle_response(&mut self, env: &E, message: &Message) -> Result<Message, AuthError> {
        let now = env.now();
        self.sweep_expired(now);

        let Payload::ChallengeResponse(response) = &message.payload else {
            return Err(AuthError::UnexpectedMessage {
                opcode: message.payload.opcode().to_u16(),
            });
        };

        let session = self
            .sessions
            .get_mut(&message.session_id)
            .filter(|s| s.state == SessionState::ChallengeIssued)
            .ok_or(AuthError::UnknownSession { session_id: message.session_id })?;

        if response.device_id != session.device_id {
            return Err(AuthError::UnauthorizedDevice { device_id: response.device_id.clone() });
        }

        if !responses_match(&session.expected, &response.response) {
            session.state = SessionState::Rejected;
            session.decided_at = Some(now);
            tracing::warn!(
                session_id = %message.session_id,
                device_id = %session.device_id,
                "response mismatch"
            );
            return Err(AuthError::ResponseMismatch);
        }

        let transcript =
            session_transcript(&message.session_id, &session.challenge_nonce, &session.expected);
        let vault = self
            .devices
            .get_mut(&session.device_id)
            .expect("session device was checked at challenge issue");
        vault.rotate(env, &transcript)?;

        session.state = SessionState::Accepted;
        session.decided_at = Some(now);
        tracing::info!(
            session_id = %message.session_id,
            device_id = %session.device_id,
            "session authenticated, mirror rotated"
        );

        Ok(Message::new(
            message.session_id,
            Payload::Verdict(Verdict { accepted: true, reason: None }),
        ))
    }

    /// Build the server's reply for a failed exchange.
    ///
    /// Most failures become a phase-4 reject verdict carrying the error's
    /// display text so the device can log why it was refused without the
    /// server exposing internal state. [`AuthError::RateLimited`] instead
    /// becomes an error report with the numeric code and the backoff hint,
    /// since no session exists to pass a verdict on.
    #[must_use]
    pub fn verdict_for_error(session_id: SessionId, error: &AuthError) -> Message {
        let payload = match error {
            AuthError::RateLimited { retry_after } => Payload::Error(ErrorReport {
                code: error.code(),
                message: error.to_string(),
                retry_after_ms: Some(retry_after.as_millis() as u64),
            }),
            _ => Payload::Verdict(Verdict { accepted: false, reason: Some(error.to_string()) }),
        };
        Message::new(session_id, payload)
    }

    /// Drop expired sessions.
    ///
    /// Unanswered challenges expire after the session TTL; decided
    /// sessions are swept after the verdict retention period.
    fn sweep_expired(&mut self, now: E::Instant) {
        let ttl = self.config.session_ttl;
        let retention = self.config.verdict_retention;
        self.sessions.retain(|session_id, session| {
            let keep = match session.decided_at {
                None => now - session.issued_at < ttl,
                Some(decided_at) => now - decided_at < retention,
            };
            if !keep {
                tracing::debug!(session_id = %session_id, state = ?session.state, "session expired");
            }
            keep
        });
    }
}
