//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and body.
//! Uses `bytes::Bytes` for zero-copy body sharing.
//!
//! # Example
//!
//! ```
//! use pingwire::protocol::{Frame, FrameHeader, payload_type};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(FrameHeader::new(payload_type::TEXT, 4), Bytes::from_static(b"ping"));
//! assert_eq!(frame.payload_type(), 2);
//! assert_eq!(frame.body(), b"ping");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{FrameHeader, HEADER_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: FrameHeader,
    /// Body bytes.
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: FrameHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the payload type tag.
    #[inline]
    pub fn payload_type(&self) -> u8 {
        self.header.payload_type
    }

    /// Total encoded size (header + body).
    #[inline]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

/// Build a complete frame as a single contiguous buffer.
///
/// The caller is responsible for `header.length` matching `body.len()`;
/// use [`FrameHeader::for_body`] to get a checked header.
///
/// ```
/// use pingwire::protocol::{build_frame, FrameHeader};
///
/// let bytes = build_frame(&FrameHeader::new(2, 4), b"pong");
/// assert_eq!(&bytes[..], &[2, 0, 0, 0, 4, b'p', b'o', b'n', b'g']);
/// ```
pub fn build_frame(header: &FrameHeader, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_slice(&header.encode());
    buf.put_slice(body);
    buf.freeze()
}
