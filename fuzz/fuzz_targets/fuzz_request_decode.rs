#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use lookup_gateway::core::frame::FrameCodec;
use lookup_gateway::protocol::codec::ProtocolCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Request bodies must decode or fail, never panic
    let _ = ProtocolCodec::new().decode(data);
    let _ = ProtocolCodec::with_selector(':').decode(data);

    // Same bytes read as a frame stream
    let mut codec = FrameCodec::new(4096);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
