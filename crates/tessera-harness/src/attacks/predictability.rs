//! Response-predictability scenario.
//!
//! Collects the response bytes from repeated full sessions and scores two
//! weak predictors: a weight of 1.0 when consecutive responses are
//! byte-for-byte identical, 0.5 when they are strictly increasing as
//! big-endian integers. Neither is a cryptographic test; both catch
//! counter-like or constant response generators immediately.
//!
//! With per-session nonces and post-session rotation every response is an
//! independent HMAC output, so identical pairs never occur and the
//! ordering heuristic fires on roughly half the pairs by chance.

use std::cmp::Ordering;

use tessera_core::{env::Environment, error::AuthError, verifier::Verifier};
use tessera_proto::Payload;

use crate::{channel::SimChannel, device::SimulatedDevice, sim_env::SimEnv};

use super::{AttackKind, AttackResult};

/// Sessions to observe.
pub const TRIALS: usize = 30;

/// Run the scenario.
pub fn run(
    env: &SimEnv,
    channel: &SimChannel,
    device: &mut SimulatedDevice,
    verifier: &mut Verifier<SimEnv>,
) -> AttackResult {
    let started = env.now();
    let mut observed: Vec<Vec<u8>> = Vec::with_capacity(TRIALS);

    for _ in 0..TRIALS {
        if let Ok(response) = observe_session(env, channel, device, verifier) {
            observed.push(response);
        }
    }

    let mut score = 0.0f64;
    for pair in observed.windows(2) {
        match pair[0].cmp(&pair[1]) {
            Ordering::Equal => score += 1.0,
            // Lexicographic order over equal-length byte strings is
            // big-endian integer order.
            Ordering::Less => score += 0.5,
            Ordering::Greater => {}
        }
    }

    AttackResult {
        kind: AttackKind::Predictability,
        detected: score,
        trials: TRIALS,
        detection_latency_ms: (env.now() - started).as_secs_f64() * 1000.0,
    }
}

/// Run one full session and capture the response bytes off the wire.
fn observe_session(
    env: &SimEnv,
    channel: &SimChannel,
    device: &mut SimulatedDevice,
    verifier: &mut Verifier<SimEnv>,
) -> Result<Vec<u8>, AuthError> {
    let init = device.authenticator.initiate(env)?;
    let init = channel.transmit(env, init);
    let challenge = verifier.handle_auth_init(env, &init)?;
    let challenge = channel.transmit(env, challenge);
    let response = device.authenticator.handle_challenge(env, &challenge)?;
    let response = channel.transmit(env, response);

    let Payload::ChallengeResponse(r) = &response.payload else {
        unreachable!("phase 3 always carries a challenge response");
    };
    let captured = r.response.clone();

    let verdict = verifier.handle_response(env, &response)?;
    let verdict = channel.transmit(env, verdict);
    device.authenticator.handle_verdict(env, &verdict)?;
    device.reset_usage();

    Ok(captured)
}
