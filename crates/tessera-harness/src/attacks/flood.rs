//! Request-flood (DoS) scenario.
//!
//! Hammers `initiate()` through a sliding-window limiter with no pacing:
//! admitted requests cost no virtual time, rejected ones charge a 10 ms
//! backoff. With a 100 ms window capped at 50, the flood settles into a
//! fixed cycle of 50 admissions followed by 10 backoffs, so the mitigated
//! count is exact for a given attempt total.

use std::time::Duration;

use tessera_core::{
    env::Environment,
    ratelimit::{Admission, RequestWindow},
};

use crate::{device::SimulatedDevice, sim_env::SimEnv};

use super::{AttackKind, AttackResult};

/// Requests to attempt.
pub const ATTEMPTS: usize = 1000;

/// Backoff on rejection.
pub const BACKOFF: Duration = Duration::from_millis(10);

/// Run the scenario.
pub fn run(env: &SimEnv, device: &mut SimulatedDevice) -> AttackResult {
    let started = env.now();
    let mut window: RequestWindow<_> = RequestWindow::with_defaults();
    let mut mitigated = 0usize;

    for _ in 0..ATTEMPTS {
        match window.try_admit(env.now()) {
            Admission::Admitted => {
                // Forwarded to the device; abandoning the session each
                // time is exactly what a flood does.
                if device.authenticator.initiate(env).is_err() {
                    mitigated += 1;
                }
            }
            Admission::Rejected { .. } => {
                mitigated += 1;
                env.advance(BACKOFF);
            }
        }
    }
    device.reset_usage();

    AttackResult {
        kind: AttackKind::Flood,
        detected: mitigated as f64,
        trials: ATTEMPTS,
        detection_latency_ms: (env.now() - started).as_secs_f64() * 1000.0,
    }
}
