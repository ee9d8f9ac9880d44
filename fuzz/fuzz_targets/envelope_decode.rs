//! Negative-space fuzzer for envelope decoding.
//!
//! Feeds arbitrary bytes to `Envelope::decode` and, where the envelope
//! parses, to `Payload::from_envelope`. Decoding hostile input must never
//! panic, and anything that decodes must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_proto::{Envelope, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = Envelope::decode(data) else {
        return;
    };

    // INVARIANT 1: a decoded envelope re-encodes to its own input prefix
    let encoded = envelope.encode();
    assert_eq!(&data[..encoded.len()], &encoded[..]);

    // INVARIANT 2: payload decoding is panic-free; success round-trips
    if let Ok(payload) = Payload::from_envelope(&envelope) {
        let again = payload
            .clone()
            .into_envelope(envelope.header.session_id())
            .expect("re-encoding a decoded payload cannot fail");
        let reparsed = Payload::from_envelope(&again).expect("round-trip decode");
        assert_eq!(payload, reparsed);
    }
});
