//! Tessera protocol core logic
//!
//! This crate contains the pure state machine and cryptographic logic for
//! the Tessera mutual-authentication protocol. It is completely decoupled
//! from I/O, enabling deterministic testing.
//!
//! # Architecture
//!
//! ```text
//!      ┌─────────────────────────────┐
//!      │ tessera-core                │
//!      │ - Vault (key pool, crypto)  │
//!      │ - Authenticator (device)    │
//!      │ - Verifier (server)         │
//!      │ - Request rate limiting     │
//!      └─────────────────────────────┘
//!            ↓                 ↓
//!  ┌──────────────────┐  ┌───────────────────┐
//!  │ tessera-harness  │  │ production driver │
//!  │ - Virtual clock  │  │ - System clock    │
//!  │ - Seeded RNG     │  │ - OS entropy      │
//!  │ - Attack suite   │  │ - Real transport  │
//!  └──────────────────┘  └───────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in core: never call `std::time::Instant::now()` or an ambient
//!   RNG directly
//! - Environment trait: all side effects (time, entropy) go through
//!   [`env::Environment`]
//! - Synchronous: every core operation is a bounded-time computation; delay
//!   and transport belong to the driver
//! - Owned state: a [`vault::Vault`] belongs to exactly one party, a
//!   [`verifier::Verifier`] owns its session table; there are no ambient
//!   singletons
//!
//! # Modules
//!
//! - [`vault`]: rotating key pool, challenge-response derivation, rotation
//! - [`authenticator`]: device-side session state machine
//! - [`verifier`]: server-side session manager and response validation
//! - [`ratelimit`]: sliding-window request limiter
//! - [`env`]: environment abstraction (time, entropy)
//! - [`error`]: authentication error taxonomy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod authenticator;
pub mod env;
pub mod error;
pub mod ratelimit;
pub mod vault;
pub mod verifier;

pub use authenticator::{AuthState, Authenticator};
pub use env::{Environment, SystemEnv};
pub use error::{AuthError, VaultError};
pub use ratelimit::{Admission, RequestWindow};
pub use vault::{Vault, responses_match, session_transcript};
pub use verifier::{SessionState, Verifier, VerifierConfig};
