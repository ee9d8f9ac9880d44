//! Property-based tests for the wire format.
//!
//! - Arbitrary bytes never panic the decoders
//! - Structured messages round-trip through the wire form
//! - Header invariants hold for all session ids and payload sizes

use proptest::prelude::*;
use tessera_proto::{
    Envelope, EnvelopeHeader, Message, Opcode, Payload, SessionId,
    payloads::{AuthInit, Challenge, ChallengeResponse, ErrorReport, Verdict},
};

fn payload_strategy() -> impl Strategy<Value = Payload> {
    let device_id = "[a-z]{1,12}_[0-9]{1,4}";
    prop_oneof![
        device_id.prop_map(|device_id| Payload::AuthInit(AuthInit { device_id })),
        (device_id, prop::collection::vec(any::<u32>(), 1..8), prop::collection::vec(any::<u8>(), 1..64))
            .prop_map(|(device_id, indices, nonce)| {
                Payload::Challenge(Challenge { device_id, indices, nonce })
            }),
        (device_id, prop::collection::vec(any::<u8>(), 32), prop::collection::vec(any::<u8>(), 32))
            .prop_map(|(device_id, response, nonce)| {
                Payload::ChallengeResponse(ChallengeResponse { device_id, response, nonce })
            }),
        (any::<bool>(), prop::option::of(".{0,40}"))
            .prop_map(|(accepted, reason)| Payload::Verdict(Verdict { accepted, reason })),
        (any::<u16>(), ".{0,40}", prop::option::of(any::<u64>()))
            .prop_map(|(code, message, retry_after_ms)| {
                Payload::Error(ErrorReport { code, message, retry_after_ms })
            }),
    ]
}

#[test]
fn prop_decode_never_panics_on_arbitrary_bytes() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        // Any outcome is fine except a panic.
        let _ = Message::decode(&bytes);
        let _ = Envelope::decode(&bytes);
        let _ = EnvelopeHeader::from_bytes(&bytes);
    });
}

#[test]
fn prop_messages_round_trip() {
    proptest!(|(payload in payload_strategy(), id in any::<[u8; 16]>())| {
        let message = Message::new(SessionId::from_bytes(id), payload);
        let wire = message.encode().unwrap();
        let decoded = Message::decode(&wire).unwrap();
        prop_assert_eq!(decoded, message);
    });
}

#[test]
fn prop_header_session_binding_survives_the_wire() {
    proptest!(|(id in any::<[u8; 16]>(), size in 0u32..=EnvelopeHeader::MAX_PAYLOAD_SIZE)| {
        let mut header = EnvelopeHeader::new(Opcode::AuthInit, id);
        // Fabricate the size field directly; only in-range claims parse.
        let mut bytes = header.to_bytes();
        bytes[8..12].copy_from_slice(&size.to_be_bytes());

        let parsed = EnvelopeHeader::from_bytes(&bytes).unwrap();
        prop_assert_eq!(parsed.session_id(), id);
        prop_assert_eq!(parsed.payload_size(), size);

        header = *parsed;
        prop_assert_eq!(header.to_bytes(), bytes);
    });
}

#[test]
fn prop_tampered_opcode_is_rejected_or_reinterpreted_consistently() {
    proptest!(|(raw in any::<u16>())| {
        match Opcode::from_u16(raw) {
            Some(opcode) => prop_assert_eq!(opcode.to_u16(), raw),
            None => {
                // Unknown opcodes must fail payload extraction.
                let mut bytes = EnvelopeHeader::new(Opcode::AuthInit, [0; 16]).to_bytes();
                bytes[6..8].copy_from_slice(&raw.to_be_bytes());
                let envelope = Envelope::decode(&bytes).unwrap();
                prop_assert!(Payload::from_envelope(&envelope).is_err());
            }
        }
    });
}
