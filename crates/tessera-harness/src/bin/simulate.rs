//! Run the adversarial suite and a fleet simulation, printing both reports.
//!
//! ```text
//! simulate [SEED] [DEVICES] [ROUNDS]
//! ```
//!
//! Defaults: seed 42, 5 devices, 3 rounds. Logging is controlled by
//! `RUST_LOG` (e.g. `RUST_LOG=tessera_core=debug`).

use std::process::ExitCode;

use tessera_harness::{AttackSuite, SimEnv, SimulationRunner, render_report};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let seed = match parse_arg(args.next(), 42, "SEED") {
        Ok(v) => v,
        Err(code) => return code,
    };
    let devices = match parse_arg(args.next(), 5, "DEVICES") {
        Ok(v) => v as usize,
        Err(code) => return code,
    };
    let rounds = match parse_arg(args.next(), 3, "ROUNDS") {
        Ok(v) => v as usize,
        Err(code) => return code,
    };

    tracing::info!(seed, devices, rounds, "starting simulation");

    let mut suite = AttackSuite::new(seed);
    let results = suite.run_all();
    println!("{}", render_report(&results));

    let mut runner = SimulationRunner::new(SimEnv::with_seed(seed), devices);
    for round in 0..rounds {
        if let Err(error) = runner.run_round() {
            eprintln!("round {round} failed: {error}");
            return ExitCode::FAILURE;
        }
    }
    println!("{}", runner.metrics().summary());

    ExitCode::SUCCESS
}

fn parse_arg(arg: Option<String>, default: u64, name: &str) -> Result<u64, ExitCode> {
    match arg {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            eprintln!("invalid {name}: {raw}");
            ExitCode::FAILURE
        }),
    }
}
