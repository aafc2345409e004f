//! Text payload variant.
//!
//! The body is kept as the exact bytes received. Peers are not required to
//! send valid UTF-8; [`TextPayload::as_str`] is the checked view and
//! `Display` renders lossily.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use super::Payload;
use crate::codec::FrameCodec;
use crate::error::{Result, WireError};
use crate::protocol::payload_type;

/// Text carried in a frame tagged [`payload_type::TEXT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextPayload(Bytes);

impl TextPayload {
    /// Wrap a string value.
    pub fn new(text: impl Into<String>) -> Self {
        Self(Bytes::from(text.into()))
    }

    /// Take a frame body as-is.
    pub fn from_body(body: Bytes) -> Self {
        Self(body)
    }

    /// The body, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render the body, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Whether the body is exactly `text`.
    #[inline]
    pub fn is(&self, text: &str) -> bool {
        self.0 == text.as_bytes()
    }

    /// Convert into a `String`, failing with `InvalidText` on bad UTF-8.
    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.0.to_vec()).map_err(WireError::InvalidText)
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Read exactly one text frame from `reader`.
    ///
    /// A frame with any other tag fails with `UnknownPayloadType`.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let payload = FrameCodec::new().decode(reader).await?;
        let tag = payload.payload_type();
        payload
            .downcast::<Self>()
            .ok_or(WireError::UnknownPayloadType(tag))
    }

    /// Write this payload as one frame, returning the bytes written.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        FrameCodec::new().write(writer, self).await
    }

    pub(crate) fn decode_boxed(body: Bytes) -> Result<Box<dyn Payload>> {
        Ok(Box::new(Self::from_body(body)))
    }
}

impl Payload for TextPayload {
    fn payload_type(&self) -> u8 {
        payload_type::TEXT
    }

    fn bytes(&self) -> Bytes {
        self.0.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl fmt::Display for TextPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for TextPayload {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TextPayload {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Bytes> for TextPayload {
    fn from(body: Bytes) -> Self {
        Self(body)
    }
}

impl From<Vec<u8>> for TextPayload {
    fn from(body: Vec<u8>) -> Self {
        Self(Bytes::from(body))
    }
}
