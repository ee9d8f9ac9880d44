//! # Tessera Protocol: Wire Format
//!
//! This crate implements the message layer for the Tessera mutual
//! authentication protocol: a four-phase challenge-response exchange between
//! a resource-constrained device and an authenticating server.
//!
//! ## Protocol Design
//!
//! Messages use a hybrid encoding:
//! - **EnvelopeHeader**: 32 bytes of raw binary (Big Endian) for zero-copy
//!   session routing
//! - **Payload**: Variable-length CBOR-encoded structured data
//!
//! The header carries the session id, so a server can route a message to its
//! session record without deserializing the payload.
//!
//! ## One Variant Per Phase
//!
//! Each protocol phase has its own payload type. There is no "grab bag"
//! message with optional fields: a phase-3 message structurally cannot carry
//! a challenge, and a phase-2 message cannot carry a response. Invalid shapes
//! are rejected at decode time, not at field-access time.
//!
//! ## Security Properties
//!
//! - **No Unsafe Deserialization**: Header parsing uses `zerocopy` with
//!   compile-time layout verification. Malformed envelopes are rejected
//!   before any data is copied.
//!
//! - **Size Limits**: Payloads are capped at 64 KiB. Authentication messages
//!   are tiny; anything larger is hostile.
//!
//! - **Explicit Validation**: All constructors and parsing functions validate
//!   invariants and return `Result` types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod header;
pub mod message;
pub mod opcodes;
pub mod payloads;

pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use header::EnvelopeHeader;
pub use message::{Message, SessionId};
pub use opcodes::Opcode;
pub use payloads::Payload;
