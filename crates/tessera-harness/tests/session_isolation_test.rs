//! Interleaved sessions must never share or corrupt each other's state.

use tessera_core::verifier::{SessionState, Verifier, VerifierConfig};
use tessera_harness::{SimEnv, SimulatedDevice};
use tessera_proto::Payload;

const FLEET: usize = 8;

fn provision_fleet(env: &SimEnv) -> (Vec<SimulatedDevice>, Verifier<SimEnv>) {
    let mut verifier = Verifier::new(VerifierConfig::default());
    let mut devices = Vec::with_capacity(FLEET);
    for i in 0..FLEET {
        let device_id = format!("dev_{i}");
        let (device, mirror) = SimulatedDevice::provision(env, &device_id, 10, 128);
        verifier.register_device(device_id, mirror);
        devices.push(device);
    }
    (devices, verifier)
}

#[test]
fn interleaved_sessions_complete_independently() {
    let env = SimEnv::with_seed(11);
    let (mut devices, mut verifier) = provision_fleet(&env);

    // Phase 1 for everyone before any phase 2
    let inits: Vec<_> = devices
        .iter_mut()
        .map(|d| d.authenticator.initiate(&env).expect("initiate"))
        .collect();

    // Challenges issued in order; session table holds all of them at once
    let challenges: Vec<_> = inits
        .iter()
        .map(|m| verifier.handle_auth_init(&env, m).expect("challenge"))
        .collect();
    assert_eq!(verifier.session_count(), FLEET);

    // Responses computed in order, but submitted in reverse
    let responses: Vec<_> = devices
        .iter_mut()
        .zip(&challenges)
        .map(|(d, c)| d.authenticator.handle_challenge(&env, c).expect("respond"))
        .collect();

    for (idx, response) in responses.iter().enumerate().rev() {
        let verdict = verifier.handle_response(&env, response).expect("verdict");
        assert!(devices[idx].authenticator.handle_verdict(&env, &verdict).expect("accept"));
    }

    for init in &inits {
        assert_eq!(verifier.session_state(&init.session_id), Some(SessionState::Accepted));
    }
}

#[test]
fn each_challenge_is_bound_to_its_own_session() {
    let env = SimEnv::with_seed(13);
    let (mut devices, mut verifier) = provision_fleet(&env);

    let init_a = devices[0].authenticator.initiate(&env).expect("initiate a");
    let init_b = devices[1].authenticator.initiate(&env).expect("initiate b");
    let challenge_a = verifier.handle_auth_init(&env, &init_a).expect("challenge a");
    let challenge_b = verifier.handle_auth_init(&env, &init_b).expect("challenge b");

    assert_ne!(init_a.session_id, init_b.session_id);
    assert_eq!(challenge_a.session_id, init_a.session_id);
    assert_eq!(challenge_b.session_id, init_b.session_id);

    // Delivering b's challenge to a is rejected, and a's own session
    // survives to complete normally afterwards.
    let err = devices[0].authenticator.handle_challenge(&env, &challenge_b).unwrap_err();
    assert!(matches!(err, tessera_core::AuthError::UnknownSession { .. }));

    let response_a = devices[0].authenticator.handle_challenge(&env, &challenge_a).expect("respond");
    let verdict_a = verifier.handle_response(&env, &response_a).expect("verdict");
    assert!(devices[0].authenticator.handle_verdict(&env, &verdict_a).expect("accept"));
}

#[test]
fn cross_device_response_is_refused() {
    let env = SimEnv::with_seed(17);
    let (mut devices, mut verifier) = provision_fleet(&env);

    let init_a = devices[0].authenticator.initiate(&env).expect("initiate a");
    let init_b = devices[1].authenticator.initiate(&env).expect("initiate b");
    let challenge_a = verifier.handle_auth_init(&env, &init_a).expect("challenge a");
    let _challenge_b = verifier.handle_auth_init(&env, &init_b).expect("challenge b");

    // Device 1 claims device 0's session with its own identity.
    let mut forged = devices[0]
        .authenticator
        .handle_challenge(&env, &challenge_a)
        .expect("respond");
    if let Payload::ChallengeResponse(r) = &mut forged.payload {
        r.device_id = "dev_1".into();
    }

    let err = verifier.handle_response(&env, &forged).unwrap_err();
    assert!(matches!(err, tessera_core::AuthError::UnauthorizedDevice { .. }));
}
