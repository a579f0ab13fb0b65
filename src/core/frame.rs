//! Length-prefixed message framing.
//!
//! ```text
//! [Length(4, big-endian)] [Body(N)]
//! ```
//!
//! The decoder enforces a maximum body size. A frame above the limit is
//! skipped in full, even across reads, and surfaces as
//! [`Frame::Oversized`] so the peer still receives a reply and the stream
//! stays aligned on frame boundaries.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{GatewayError, Result};

/// Size of the length prefix
pub const LENGTH_PREFIX: usize = 4;

/// One inbound unit of the message stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete message body
    Message(Bytes),
    /// A message whose declared body exceeded the limit; body discarded
    Oversized(usize),
}

impl Frame {
    /// Declared body length
    pub fn len(&self) -> usize {
        match self {
            Frame::Message(body) => body.len(),
            Frame::Oversized(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_size: usize,
    /// Bytes of an oversized body still to skip
    discarding: usize,
}

impl FrameCodec {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            discarding: 0,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = GatewayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if self.discarding > 0 {
            let skip = self.discarding.min(src.len());
            src.advance(skip);
            self.discarding -= skip;
            if self.discarding > 0 {
                return Ok(None);
            }
        }

        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if len > self.max_size {
            src.advance(LENGTH_PREFIX);
            let skip = len.min(src.len());
            src.advance(skip);
            self.discarding = len - skip;
            return Ok(Some(Frame::Oversized(len)));
        }

        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        Ok(Some(Frame::Message(src.split_to(len).freeze())))
    }
}

// The encoder does not apply the decode limit; limits are the receiver's call
impl Encoder<Bytes> for FrameCodec {
    type Error = GatewayError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        let len = u32::try_from(body.len())
            .map_err(|_| GatewayError::OversizedMessage(body.len()))?;

        dst.reserve(LENGTH_PREFIX + body.len());
        dst.put_u32(len);
        dst.extend_from_slice(&body);
        Ok(())
    }
}
