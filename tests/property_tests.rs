//! Property-based tests using proptest
//!
//! These tests check the codec and normalization invariants over randomly
//! generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use lookup_gateway::core::frame::{Frame, FrameCodec};
use lookup_gateway::driver::http::parse_reply;
use lookup_gateway::driver::strip_wrapping_quotes;
use lookup_gateway::error::status;
use lookup_gateway::protocol::codec::ProtocolCodec;
use lookup_gateway::protocol::message::Reply;
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};

// Property: quote stripping is idempotent on its own output for values
// that carried a wrapping pair
proptest! {
    #[test]
    fn prop_strip_wrapped_value(inner in "[0-9A-Za-z]{0,32}") {
        let wrapped = format!("\"{inner}\"");
        let once = strip_wrapping_quotes(&wrapped);
        prop_assert_eq!(once, inner.as_str());
        prop_assert_eq!(strip_wrapping_quotes(once), once);
    }
}

// Property: stripping never removes more than one quote per side
proptest! {
    #[test]
    fn prop_strip_removes_at_most_two_chars(value in ".{0,64}") {
        let stripped = strip_wrapping_quotes(&value);
        prop_assert!(value.len() - stripped.len() <= 2);
        prop_assert!(value.contains(stripped));
    }
}

// Property: decoding arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_decode_never_panics(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = ProtocolCodec::new().decode(&body);
        let _ = ProtocolCodec::with_selector(':').decode(&body);
    }
}

// Property: every well-formed key decodes to itself
proptest! {
    #[test]
    fn prop_valid_keys_decode(key in "[0-9A-Za-z+._-]{1,64}") {
        let request = ProtocolCodec::new().decode(key.as_bytes()).expect("valid key");
        prop_assert_eq!(request.key, key);
    }
}

// Property: the resolved value of a JSON string field is the string itself
proptest! {
    #[test]
    fn prop_lrn_string_is_extracted(lrn in "[0-9]{1,15}") {
        let body = serde_json::json!({ "lrn": lrn }).to_string();
        let resolution = parse_reply(body.as_bytes()).expect("lrn present");
        prop_assert_eq!(resolution.resolved_value(), lrn.as_str());
        prop_assert_eq!(resolution.raw_response(), body.as_str());
    }
}

// Property: error replies are never successes
proptest! {
    #[test]
    fn prop_error_reply_is_failure(code in any::<i32>(), text in ".{0,64}") {
        let reply = Reply::from_bytes(&Reply::error(text, code).to_bytes()).unwrap();
        prop_assert!(!reply.is_success());
        prop_assert_ne!(reply.status_code, status::OK);
    }
}

// Property: the frame decoder yields the same frames however the stream is split
proptest! {
    #[test]
    fn prop_frames_survive_arbitrary_splits(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..8),
        chunk in 1usize..17,
    ) {
        let limit = 32;
        let mut wire = BytesMut::new();
        for body in &bodies {
            FrameCodec::new(usize::MAX)
                .encode(Bytes::copy_from_slice(body), &mut wire)
                .unwrap();
        }

        let mut codec = FrameCodec::new(limit);
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for piece in wire.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        prop_assert_eq!(frames.len(), bodies.len());
        for (frame, body) in frames.iter().zip(&bodies) {
            if body.len() > limit {
                prop_assert_eq!(frame, &Frame::Oversized(body.len()));
            } else {
                prop_assert_eq!(frame, &Frame::Message(Bytes::copy_from_slice(body)));
            }
        }
    }
}
