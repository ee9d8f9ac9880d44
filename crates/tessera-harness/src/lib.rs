//! Deterministic simulation harness for Tessera protocol testing.
//!
//! This crate provides a virtual-clock implementation of the
//! `Environment` trait, a constrained-device model with energy
//! accounting, a jittered lossless transport, a fleet runner with
//! metrics, and an adversarial scenario suite — all reproducible from a
//! single seed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attacks;
pub mod channel;
pub mod device;
pub mod metrics;
pub mod runner;
pub mod sim_env;
pub mod stats;

pub use attacks::{AttackKind, AttackResult, AttackSuite, render_report};
pub use channel::SimChannel;
pub use device::{DeviceSpecs, SimulatedDevice};
pub use metrics::{MetricsSummary, SimulationMetrics};
pub use runner::SimulationRunner;
pub use sim_env::{SimEnv, SimInstant};
