//! Per-run measurement collection for the fleet simulation.

use std::fmt;

use crate::stats;

/// Raw measurement series collected over a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimulationMetrics {
    auth_time_ms: Vec<f64>,
    energy_mwh: Vec<f64>,
    memory_kb: Vec<f64>,
}

impl SimulationMetrics {
    /// Empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed authentication attempt.
    pub fn add_measurement(&mut self, auth_time_ms: f64, energy_mwh: f64, memory_kb: f64) {
        self.auth_time_ms.push(auth_time_ms);
        self.energy_mwh.push(energy_mwh);
        self.memory_kb.push(memory_kb);
    }

    /// Number of recorded attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auth_time_ms.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auth_time_ms.is_empty()
    }

    /// Aggregate the series into a summary.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            runs: self.auth_time_ms.len(),
            mean_auth_time_ms: stats::mean(&self.auth_time_ms),
            auth_time_std_dev_ms: stats::std_dev(&self.auth_time_ms),
            mean_energy_mwh: stats::mean(&self.energy_mwh),
            peak_memory_kb: self.memory_kb.iter().copied().fold(0.0, f64::max),
        }
    }
}

/// Aggregated view of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    /// Recorded authentication attempts
    pub runs: usize,
    /// Mean wall (virtual) time per authentication, in ms
    pub mean_auth_time_ms: f64,
    /// Spread of authentication times, in ms
    pub auth_time_std_dev_ms: f64,
    /// Mean cumulative device energy at measurement time, in mWh
    pub mean_energy_mwh: f64,
    /// Highest per-session memory observed, in KB
    pub peak_memory_kb: f64,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Metrics ===")?;
        writeln!(f, "authentications: {}", self.runs)?;
        writeln!(
            f,
            "auth time:       {:.2} ms (σ {:.2} ms)",
            self.mean_auth_time_ms, self.auth_time_std_dev_ms
        )?;
        writeln!(f, "energy:          {:.6} mWh mean cumulative", self.mean_energy_mwh)?;
        write!(f, "peak memory:     {:.1} KB", self.peak_memory_kb)
    }
}
