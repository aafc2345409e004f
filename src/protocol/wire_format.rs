//! Wire format encoding and decoding.
//!
//! Every frame starts with a 5-byte header:
//! ```text
//! ┌───────┬──────────┬────────────────┐
//! │ Type  │ Length   │ Body           │
//! │ 1 byte│ 4 bytes  │ Length bytes   │
//! │       │ uint32 BE│                │
//! └───────┴──────────┴────────────────┘
//! ```
//!
//! The length is Big Endian and never exceeds [`MAX_PAYLOAD_SIZE`].

use crate::error::{Result, WireError};

/// Header size in bytes (type tag + length).
pub const HEADER_SIZE: usize = 5;

/// Maximum body size accepted or produced (10 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 10 << 20;

/// Payload type tags.
pub mod payload_type {
    /// Reserved for a binary payload variant; not registered by default.
    pub const BINARY: u8 = 1;
    /// UTF-8 text payload.
    pub const TEXT: u8 = 2;
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload type tag.
    pub payload_type: u8,
    /// Body length in bytes.
    pub length: u32,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(payload_type: u8, length: u32) -> Self {
        Self {
            payload_type,
            length,
        }
    }

    /// Create a header for a body, rejecting bodies above `max_payload_size`.
    pub fn for_body(payload_type: u8, body: &[u8], max_payload_size: u32) -> Result<Self> {
        let length = body.len() as u64;
        if length > u64::from(max_payload_size) {
            return Err(WireError::PayloadTooLarge {
                length,
                max: max_payload_size,
            });
        }
        Ok(Self::new(payload_type, length as u32))
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use pingwire::protocol::{FrameHeader, payload_type};
    ///
    /// let header = FrameHeader::new(payload_type::TEXT, 4);
    /// assert_eq!(header.encode(), [2, 0, 0, 0, 4]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.payload_type;
        buf[1..5].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            payload_type: buf[0],
            length: u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }

    /// Check the declared length against the limit.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.length > max_payload_size {
            return Err(WireError::PayloadTooLarge {
                length: u64::from(self.length),
                max: max_payload_size,
            });
        }
        Ok(())
    }
}
