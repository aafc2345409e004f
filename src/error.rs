//! Error types for pingwire.

use std::io;

use thiserror::Error;

/// Main error type for all framing, heartbeat and relay operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error during stream operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The type tag of a frame matches no registered payload variant.
    #[error("unknown payload type: {0}")]
    UnknownPayloadType(u8),

    /// Declared or actual payload length exceeds the configured maximum.
    #[error("payload size {length} exceeds maximum {max}")]
    PayloadTooLarge { length: u64, max: u32 },

    /// The stream ended inside the 5-byte frame header.
    #[error("truncated frame header: read {received} bytes")]
    TruncatedHeader { received: usize },

    /// The stream ended before the declared body length was read.
    #[error("truncated payload: expected {expected} bytes, read {received}")]
    TruncatedPayload { expected: u32, received: usize },

    /// A text payload was converted to a `String` but is not valid UTF-8.
    #[error("text payload is not valid UTF-8")]
    InvalidText(#[source] std::string::FromUtf8Error),

    /// Writing an encoded frame to the sink failed.
    #[error("failed to write frame: {0}")]
    Encode(#[source] io::Error),

    /// The stream closed cleanly before a new frame started.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The relay could not dial its downstream target.
    #[error("downstream {addr} unreachable: {source}")]
    DownstreamUnreachable {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// An established relay leg failed with an unexpected I/O error.
    #[error("relay {direction} failed: {source}")]
    Relay {
        direction: crate::relay::Direction,
        #[source]
        source: io::Error,
    },

    /// A ping was answered with something other than a pong.
    #[error("unexpected reply: {0:?}")]
    UnexpectedReply(String),

    /// Invalid configuration input.
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Config(e.to_string())
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
