//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: need at least 5 bytes
//! - `WaitingForBody`: header parsed, need N more body bytes
//!
//! # Example
//!
//! ```
//! use pingwire::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//! assert!(buffer.push(&[2, 0, 0]).unwrap().is_empty());
//!
//! let frames = buffer.push(&[0, 4, b'p', b'i', b'n', b'g']).unwrap();
//! assert_eq!(frames[0].body(), b"ping");
//! ```

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use super::wire_format::{FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use super::Frame;
use crate::error::{Result, WireError};
use crate::payload::PayloadRegistry;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for complete header (need 5 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for body bytes.
    WaitingForBody { header: FrameHeader },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Frames come out strictly in arrival order. After an error the buffer
/// content is unspecified; the connection should be dropped.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_payload_size: u32,
    registry: Option<Arc<PayloadRegistry>>,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default limit.
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
            registry: None,
        }
    }

    /// Reject frames whose tag is not registered in `registry`.
    ///
    /// The check runs as soon as the tag byte arrives, before the length
    /// or any body byte is waited for.
    pub fn with_registry(mut self, registry: Arc<PayloadRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPayloadType` as soon as an unregistered tag arrives
    /// (when built [`with_registry`](Self::with_registry)), and
    /// `PayloadTooLarge` as soon as a header declares a body above the
    /// limit; no body byte of that frame is buffered for extraction.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    if let (Some(registry), Some(&tag)) = (&self.registry, self.buffer.first()) {
                        if !registry.contains(tag) {
                            return Err(WireError::UnknownPayloadType(tag));
                        }
                    }
                    let Some(header) = FrameHeader::decode(&self.buffer) else {
                        return Ok(None);
                    };
                    header.validate(self.max_payload_size)?;

                    let _ = self.buffer.split_to(HEADER_SIZE);
                    if header.length == 0 {
                        return Ok(Some(Frame::new(header, Bytes::new())));
                    }
                    self.state = State::WaitingForBody { header };
                }
                State::WaitingForBody { header } => {
                    let length = header.length as usize;
                    if self.buffer.len() < length {
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(length).freeze();
                    self.state = State::WaitingForHeader;
                    return Ok(Some(Frame::new(header, body)));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether a frame has been started but not completed.
    pub fn has_partial_frame(&self) -> bool {
        !self.buffer.is_empty() || matches!(self.state, State::WaitingForBody { .. })
    }

    /// Check that the input ended on a frame boundary.
    ///
    /// Call at end of stream; leftover bytes are reported as truncation.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::WaitingForHeader if self.buffer.is_empty() => Ok(()),
            State::WaitingForHeader => Err(WireError::TruncatedHeader {
                received: self.buffer.len(),
            }),
            State::WaitingForBody { header } => Err(WireError::TruncatedPayload {
                expected: header.length,
                received: self.buffer.len(),
            }),
        }
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
