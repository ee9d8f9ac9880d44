//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system resources
//! (time and entropy). Protocol state machines in `tessera-core`:
//!
//! - MUST NOT call `std::time::Instant::now()` directly
//! - MUST NOT use an ambient RNG or system entropy directly
//! - MUST accept an `Environment` parameter for all side effects
//!
//! The trait is implemented twice:
//!
//! 1. `SimEnv` (tessera-harness): virtual clock advanced explicitly, seeded
//!    ChaCha20 RNG for reproducible runs
//! 2. [`SystemEnv`] (here): real monotonic clock and OS entropy
//!
//! Note that unlike a network runtime's environment there is no `sleep`:
//! every core operation is a synchronous, bounded-time computation, and the
//! only clock consumer is timeout bookkeeping, which takes `now` as a
//! parameter. Simulated transport delay is the harness clock's business.
//!
//! # Invariants
//!
//! - Monotonicity: `now()` never goes backwards within one execution context
//! - Determinism: with a seeded implementation, `random_bytes()` produces
//!   the same sequence for the same seed
//! - Entropy quality: production implementations draw from the OS entropy
//!   pool; challenge indices and nonces are only as good as this source

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time and entropy.
///
/// # Type Parameters
///
/// - `Instant`: a point in time. In simulation this is a virtual instant
///   that can be advanced instantly; in production it is
///   `std::time::Instant`.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Type representing a point in time.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// Subsequent calls must return values >= previous calls within one
    /// execution context.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST use a cryptographically secure
    /// source (the OS entropy pool). Session ids, challenge indices, and
    /// nonces are all drawn through this method.
    fn random_bytes(&self, dest: &mut [u8]);
}

/// Production environment: system clock and OS entropy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    /// # Panics
    ///
    /// Panics if the OS entropy pool is unavailable. There is no meaningful
    /// recovery from a dead entropy source in an authentication protocol.
    fn random_bytes(&self, dest: &mut [u8]) {
        getrandom::getrandom(dest).expect("OS entropy source unavailable");
    }
}
