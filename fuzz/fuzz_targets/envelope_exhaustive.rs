//! Exhaustive positive-space fuzzer for envelope encoding/decoding.
//!
//! Unlike random fuzzing (envelope_decode.rs), this fuzzer EXHAUSTIVELY
//! tests all combinations of:
//! - All opcodes
//! - Edge-case session ids (zero, one, high bit, all ones)
//! - Empty and boundary-sized payloads
//!
//! This ensures we don't miss bugs that occur only with specific
//! opcode+value combinations that random sampling might not hit.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_proto::{Envelope, EnvelopeHeader, Opcode};

// All opcodes to test exhaustively
const ALL_OPCODES: &[Opcode] = &[
    Opcode::AuthInit,
    Opcode::Challenge,
    Opcode::ChallengeResponse,
    Opcode::Verdict,
    Opcode::Error,
];

// Edge-case session ids
const SESSION_IDS: &[[u8; 16]] = &[
    [0x00; 16],
    [0x01; 16],
    [0x80; 16],
    [0xFF; 16],
];

// Payload sizes to test
const PAYLOAD_SIZES: &[usize] = &[
    0,    // Empty
    1,    // Single byte
    31,   // Just under header size
    32,   // Exactly header size
    255,  // One length byte
    256,  // Two length bytes
    1024, // 1KB
];

fuzz_target!(|data: &[u8]| {
    // Use input data to select which combination to test; libFuzzer
    // guides exploration while the inner loops stay exhaustive.
    if data.len() < 2 {
        return;
    }

    let opcode = ALL_OPCODES[data[0] as usize % ALL_OPCODES.len()];
    let session_id = SESSION_IDS[data[1] as usize % SESSION_IDS.len()];

    for &payload_size in PAYLOAD_SIZES {
        let payload = if payload_size <= data.len() - 2 {
            data[2..2 + payload_size].to_vec()
        } else {
            vec![0u8; payload_size]
        };

        let header = EnvelopeHeader::new(opcode, session_id);
        let envelope =
            Envelope::new(header, payload.clone()).expect("in-budget payload must be accepted");

        // INVARIANT 1: Encoding is header + payload, nothing else
        let encoded = envelope.encode();
        assert_eq!(encoded.len(), EnvelopeHeader::SIZE + payload.len());

        // INVARIANT 2: Decoding must succeed for a valid encoding
        let decoded = Envelope::decode(&encoded).expect("decode should succeed");

        // INVARIANT 3: Round-trip must be identity
        assert_eq!(decoded.header.opcode_enum(), Some(opcode));
        assert_eq!(decoded.header.session_id(), session_id);
        assert_eq!(decoded.header.payload_size() as usize, payload.len());
        assert_eq!(&decoded.payload[..], &payload[..]);
    }
});
