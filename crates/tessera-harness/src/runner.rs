//! Fleet driver: runs full authentication rounds over the simulated
//! transport and collects metrics.

use std::time::Duration;

use tessera_core::{
    env::Environment,
    error::AuthError,
    verifier::{Verifier, VerifierConfig},
};

use crate::{
    channel::SimChannel,
    device::SimulatedDevice,
    metrics::SimulationMetrics,
    sim_env::SimEnv,
};

// Per-phase device work, in ms of CPU time.
const INITIATE_MS: f64 = 20.0;
const CHALLENGE_MS: f64 = 30.0;
const RESPOND_MS: f64 = 40.0;
const ROTATE_MS: f64 = 25.0;

/// Drives a fleet of simulated devices against one verifier.
pub struct SimulationRunner {
    env: SimEnv,
    channel: SimChannel,
    verifier: Verifier<SimEnv>,
    devices: Vec<SimulatedDevice>,
    metrics: SimulationMetrics,
}

impl SimulationRunner {
    /// Provision `num_devices` devices (ids `dev_0..`) and register their
    /// vault mirrors with a fresh verifier.
    #[must_use]
    pub fn new(env: SimEnv, num_devices: usize) -> Self {
        let mut verifier = Verifier::new(VerifierConfig::default());
        let mut devices = Vec::with_capacity(num_devices);
        for i in 0..num_devices {
            let device_id = format!("dev_{i}");
            let (device, mirror) = SimulatedDevice::provision(&env, &device_id, 10, 128);
            verifier.register_device(device_id, mirror);
            devices.push(device);
        }
        Self {
            env,
            channel: SimChannel::default(),
            verifier,
            devices,
            metrics: SimulationMetrics::new(),
        }
    }

    /// Number of provisioned devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Metrics collected so far.
    #[must_use]
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Read access to a device by fleet index.
    #[must_use]
    pub fn device(&self, idx: usize) -> Option<&SimulatedDevice> {
        self.devices.get(idx)
    }

    /// Read access to the verifier.
    #[must_use]
    pub fn verifier(&self) -> &Verifier<SimEnv> {
        &self.verifier
    }

    /// Run one authentication for every device in the fleet.
    ///
    /// # Errors
    ///
    /// Propagates the first protocol or vault error; a verdict of
    /// "rejected" for an untampered run is also surfaced as
    /// [`AuthError::ResponseMismatch`] by the verifier.
    pub fn run_round(&mut self) -> Result<(), AuthError> {
        for idx in 0..self.devices.len() {
            self.authenticate(idx)?;
        }
        Ok(())
    }

    /// Run the four-phase exchange for one device, with transport latency
    /// and energy accounting, and record the measurement.
    ///
    /// # Errors
    ///
    /// Any phase error aborts the attempt; the device keeps its usage
    /// counters for inspection and is not reset.
    pub fn authenticate(&mut self, idx: usize) -> Result<bool, AuthError> {
        let started = self.env.now();
        let device = &mut self.devices[idx];

        // Phase 1: initiation
        let init = device.authenticator.initiate(&self.env)?;
        device.perform_operation(INITIATE_MS);
        self.env.advance(Duration::from_micros((INITIATE_MS * 1000.0) as u64));
        let init = self.channel.transmit(&self.env, init);

        // Phase 2: challenge
        let challenge = self.verifier.handle_auth_init(&self.env, &init)?;
        let challenge = self.channel.transmit(&self.env, challenge);
        device.perform_operation(CHALLENGE_MS);
        self.env.advance(Duration::from_micros((CHALLENGE_MS * 1000.0) as u64));

        // Phase 3: response
        let response = device.authenticator.handle_challenge(&self.env, &challenge)?;
        device.perform_operation(RESPOND_MS);
        self.env.advance(Duration::from_micros((RESPOND_MS * 1000.0) as u64));
        let response = self.channel.transmit(&self.env, response);

        // Phase 4: verdict and rotation
        let verdict = self.verifier.handle_response(&self.env, &response)?;
        let verdict = self.channel.transmit(&self.env, verdict);
        let accepted = device.authenticator.handle_verdict(&self.env, &verdict)?;
        device.perform_operation(ROTATE_MS);
        self.env.advance(Duration::from_micros((ROTATE_MS * 1000.0) as u64));

        let auth_time_ms = (self.env.now() - started).as_secs_f64() * 1000.0;
        let profile = device.power_profile();
        self.metrics.add_measurement(auth_time_ms, profile.total_energy_mwh, device.memory_used_kb());
        device.reset_usage();

        tracing::debug!(
            device_id = %device.device_id,
            accepted,
            auth_time_ms,
            "authentication round complete"
        );
        Ok(accepted)
    }
}
