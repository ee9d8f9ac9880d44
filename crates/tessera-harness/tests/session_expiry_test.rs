//! Session-table reclamation on the virtual clock.
//!
//! Unanswered challenges expire after the session TTL and behave as
//! unknown sessions from then on; decided sessions linger only for the
//! verdict retention period, so a late replay maps to an unknown session
//! rather than a second verdict.

use std::time::Duration;

use tessera_core::{
    AuthError,
    env::Environment,
    verifier::{SessionState, Verifier, VerifierConfig},
};
use tessera_harness::{SimEnv, SimulatedDevice};

fn provisioned(env: &SimEnv) -> (SimulatedDevice, Verifier<SimEnv>) {
    let mut verifier = Verifier::new(VerifierConfig::default());
    let (device, mirror) = SimulatedDevice::provision(env, "dev_0", 10, 128);
    verifier.register_device("dev_0", mirror);
    (device, verifier)
}

#[test]
fn unanswered_challenge_expires_to_unknown_session() {
    let env = SimEnv::with_seed(23);
    let (mut device, mut verifier) = provisioned(&env);
    let ttl = VerifierConfig::default().session_ttl;

    let init = device.authenticator.initiate(&env).expect("initiate");
    let challenge = verifier.handle_auth_init(&env, &init).expect("challenge");
    assert_eq!(verifier.live_sessions(), 1);

    // The device answers, but only after the challenge has gone stale.
    let response = device.authenticator.handle_challenge(&env, &challenge).expect("respond");
    env.advance(ttl + Duration::from_secs(1));
    verifier.tick(env.now());
    assert_eq!(verifier.live_sessions(), 0);
    assert_eq!(verifier.session_state(&init.session_id), None);

    let err = verifier.handle_response(&env, &response).unwrap_err();
    assert!(matches!(err, AuthError::UnknownSession { .. }));
}

#[test]
fn pending_session_survives_within_ttl() {
    let env = SimEnv::with_seed(29);
    let (mut device, mut verifier) = provisioned(&env);
    let ttl = VerifierConfig::default().session_ttl;

    let init = device.authenticator.initiate(&env).expect("initiate");
    let challenge = verifier.handle_auth_init(&env, &init).expect("challenge");

    env.advance(ttl - Duration::from_secs(1));
    verifier.tick(env.now());
    assert_eq!(verifier.live_sessions(), 1);

    let response = device.authenticator.handle_challenge(&env, &challenge).expect("respond");
    let verdict = verifier.handle_response(&env, &response).expect("verdict");
    assert!(device.authenticator.handle_verdict(&env, &verdict).expect("accept"));
}

#[test]
fn decided_session_is_swept_after_retention() {
    let env = SimEnv::with_seed(31);
    let (mut device, mut verifier) = provisioned(&env);
    let retention = VerifierConfig::default().verdict_retention;

    let init = device.authenticator.initiate(&env).expect("initiate");
    let challenge = verifier.handle_auth_init(&env, &init).expect("challenge");
    let response = device.authenticator.handle_challenge(&env, &challenge).expect("respond");
    let verdict = verifier.handle_response(&env, &response).expect("verdict");
    assert!(device.authenticator.handle_verdict(&env, &verdict).expect("accept"));
    assert_eq!(verifier.session_state(&init.session_id), Some(SessionState::Accepted));

    // Both vaults rotated together; the verdict record is still auditable.
    let device_print = device.authenticator.vault().fingerprint().expect("device fingerprint");
    let server_print = verifier.device_fingerprint("dev_0").expect("server fingerprint");
    assert_eq!(device_print, server_print);

    env.advance(retention + Duration::from_secs(1));
    verifier.tick(env.now());
    assert_eq!(verifier.session_state(&init.session_id), None);
    assert_eq!(verifier.session_count(), 0);

    // A replayed (previously valid) response finds no session to decide.
    let err = verifier.handle_response(&env, &response).unwrap_err();
    assert!(matches!(err, AuthError::UnknownSession { .. }));
}

#[test]
fn unprovisioned_device_has_no_fingerprint() {
    let env = SimEnv::with_seed(37);
    let (_device, verifier) = provisioned(&env);
    let err = verifier.device_fingerprint("dev_ghost").unwrap_err();
    assert!(matches!(err, AuthError::UnauthorizedDevice { .. }));
}
