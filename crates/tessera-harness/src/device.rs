//! Constrained-device model: energy, CPU, and memory accounting.
//!
//! Models a small embedded platform (a few MHz, tens of KB of RAM, coin
//! cell scale power) around the device-side [`Authenticator`]. The energy
//! model is deliberately coarse: each protocol operation draws a current
//! between base and peak in proportion to CPU load, and load steps up with
//! every operation until the post-session reset. That coarseness is what
//! the side-channel scenario exploits.

use tessera_core::{Vault, authenticator::Authenticator, env::Environment};

/// Hardware characteristics of a simulated device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSpecs {
    /// Total RAM in KB
    pub memory_kb: f64,
    /// CPU clock in MHz
    pub cpu_mhz: f64,
    /// Supply voltage in volts
    pub voltage_v: f64,
    /// Idle current draw in mA
    pub base_current_ma: f64,
    /// Full-load current draw in mA
    pub peak_current_ma: f64,
}

impl Default for DeviceSpecs {
    fn default() -> Self {
        Self {
            memory_kb: 32.0,
            cpu_mhz: 16.0,
            voltage_v: 3.3,
            base_current_ma: 5.0,
            peak_current_ma: 20.0,
        }
    }
}

/// Instantaneous power readout.
#[derive(Debug, Clone, Copy)]
pub struct PowerProfile {
    /// Supply voltage in volts
    pub voltage_v: f64,
    /// Current draw at the present CPU load, in mA
    pub current_ma: f64,
    /// Instantaneous power in mW
    pub power_mw: f64,
    /// Lifetime energy consumed, in mWh
    pub total_energy_mwh: f64,
}

/// A simulated constrained device: an [`Authenticator`] plus resource
/// accounting.
#[derive(Debug)]
pub struct SimulatedDevice {
    /// Provisioned device identity.
    pub device_id: String,
    /// Hardware characteristics.
    pub specs: DeviceSpecs,
    /// The device-side protocol state machine.
    pub authenticator: Authenticator,
    cpu_load: f64,
    memory_used_kb: f64,
    energy_mwh: f64,
    auth_attempts: u64,
}

impl SimulatedDevice {
    /// Provision a device: create its vault, wire up the authenticator,
    /// and return the device together with the server-side mirror of the
    /// vault.
    pub fn provision<E: Environment>(
        env: &E,
        device_id: impl Into<String>,
        key_count: usize,
        key_bits: usize,
    ) -> (Self, Vault) {
        let device_id = device_id.into();
        let vault = Vault::new(env, key_count, key_bits);
        let mirror = vault.mirror();
        let mut authenticator = Authenticator::new(vault);
        authenticator.set_device_id(device_id.clone());
        let device = Self {
            device_id,
            specs: DeviceSpecs::default(),
            authenticator,
            cpu_load: 0.0,
            memory_used_kb: 0.0,
            energy_mwh: 0.0,
            auth_attempts: 0,
        };
        (device, mirror)
    }

    /// Account for one protocol operation taking `operation_ms`.
    ///
    /// Current draw scales linearly with CPU load between base and peak;
    /// load steps up by 0.2 per operation (saturating at 1.0), and memory
    /// grows at 0.1 KB per ms of work, capped at the device's RAM.
    pub fn perform_operation(&mut self, operation_ms: f64) {
        let current_ma = self.specs.base_current_ma
            + (self.specs.peak_current_ma - self.specs.base_current_ma) * self.cpu_load;

        // mWh: V * mA gives mW, ms / 3_600_000 gives hours
        let energy_mwh = self.specs.voltage_v * current_ma * operation_ms / 3_600_000.0;
        self.energy_mwh += energy_mwh;

        self.cpu_load = (self.cpu_load + 0.2).min(1.0);
        self.memory_used_kb =
            (self.memory_used_kb + operation_ms * 0.1).min(self.specs.memory_kb);
    }

    /// Reset per-session load and memory after an authentication attempt.
    ///
    /// Lifetime energy is deliberately not reset.
    pub fn reset_usage(&mut self) {
        self.cpu_load = 0.0;
        self.memory_used_kb = 0.0;
        self.auth_attempts += 1;
    }

    /// Current power readout.
    #[must_use]
    pub fn power_profile(&self) -> PowerProfile {
        let current_ma = self.specs.base_current_ma
            + (self.specs.peak_current_ma - self.specs.base_current_ma) * self.cpu_load;
        PowerProfile {
            voltage_v: self.specs.voltage_v,
            current_ma,
            power_mw: self.specs.voltage_v * current_ma,
            total_energy_mwh: self.energy_mwh,
        }
    }

    /// Lifetime energy consumed in mWh.
    #[must_use]
    pub fn energy_mwh(&self) -> f64 {
        self.energy_mwh
    }

    /// Per-session memory in use, in KB.
    #[must_use]
    pub fn memory_used_kb(&self) -> f64 {
        self.memory_used_kb
    }

    /// Completed authentication attempts (successful or not).
    #[must_use]
    pub fn auth_attempts(&self) -> u64 {
        self.auth_attempts
    }
}
