//! Envelope codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use eventlink_core::protocol::{decode, decode_bytes, encode, Envelope};

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "envelope_min.json",
        "envelope_full.json",
        "envelope_millis_timestamp.json",
        "envelope_unknown_fields.json",
        "envelope_missing_type.json",
        "envelope_empty_type.json",
        "envelope_type_not_string.json",
        "envelope_bad_timestamp.json",
        "envelope_naive_timestamp.json",
        "envelope_seconds_timestamp.json",
        "envelope_not_json.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode(&v.frame);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(env.event_type, ex["type"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.room.as_deref(), ex["room"].as_str(), "vector={}", v.description);
        assert_eq!(env.id.as_deref(), ex["id"].as_str(), "vector={}", v.description);
        assert_eq!(env.payload, ex["payload"], "vector={}", v.description);
        match ex["timestamp_ms"].as_i64() {
            Some(ms) => assert_eq!(env.timestamp.unwrap().timestamp_millis(), ms, "vector={}", v.description),
            None => assert!(env.timestamp.is_none(), "vector={}", v.description),
        }
    }
}

#[test]
fn encoded_frames_decode_to_the_same_envelope() {
    let env = Envelope::new("record:created", serde_json::json!({"id": "rec9"})).with_room("tbl_3");
    let s = encode(&env).unwrap();
    let back = decode(&s).unwrap();
    assert_eq!(back, env);
}

#[test]
fn binary_frames_carry_utf8_json() {
    let env = decode_bytes(br#"{"type":"chat.stream","payload":{"delta":"he"}}"#).unwrap();
    assert_eq!(env.event_type, "chat.stream");
    assert!(decode_bytes(&[0xff, 0xfe]).is_err());
}
