//! Frame codec - one payload per frame over an async byte stream.
//!
//! Decoding reads strictly one frame: tag, length, body. Every error leaves
//! the stream somewhere inside a frame, so the caller must drop the
//! connection rather than try another decode.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, WireError};
use crate::payload::{Payload, PayloadRegistry};
use crate::protocol::{build_frame, Frame, FrameBuffer, FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Encoder/decoder bound to a payload registry and a size limit.
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    registry: Arc<PayloadRegistry>,
    max_payload_size: u32,
}

impl FrameCodec {
    /// Codec over the standard registry with the 10 MiB limit.
    pub fn new() -> Self {
        Self::with_registry(PayloadRegistry::standard())
    }

    /// Codec over a custom registry.
    pub fn with_registry(registry: Arc<PayloadRegistry>) -> Self {
        Self {
            registry,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    /// Lower the body size limit.
    ///
    /// Values above [`MAX_PAYLOAD_SIZE`] are clamped to it.
    pub fn with_max_payload(mut self, max_payload_size: u32) -> Self {
        self.max_payload_size = max_payload_size.min(MAX_PAYLOAD_SIZE);
        self
    }

    #[inline]
    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    #[inline]
    pub fn max_payload_size(&self) -> u32 {
        self.max_payload_size
    }

    /// Create a frame buffer using this codec's size limit and registry.
    pub fn frame_buffer(&self) -> FrameBuffer {
        FrameBuffer::with_max_payload(self.max_payload_size)
            .with_registry(Arc::clone(&self.registry))
    }

    /// Encode a payload into a complete frame.
    ///
    /// Fails with `PayloadTooLarge` instead of producing an invalid frame.
    pub fn encode(&self, payload: &dyn Payload) -> Result<Bytes> {
        let body = payload.bytes();
        let header = FrameHeader::for_body(payload.payload_type(), &body, self.max_payload_size)?;
        Ok(build_frame(&header, &body))
    }

    /// Encode and write one frame, then flush.
    ///
    /// Returns the number of bytes written. Nothing is written when the
    /// payload is too large; a sink failure is reported as `Encode`.
    pub async fn write<W>(&self, writer: &mut W, payload: &dyn Payload) -> Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = self.encode(payload)?;
        writer.write_all(&frame).await.map_err(WireError::Encode)?;
        writer.flush().await.map_err(WireError::Encode)?;
        Ok(frame.len())
    }

    /// Read exactly one raw frame.
    ///
    /// The tag is checked against the registry before the length is read,
    /// and the length against the limit before any body byte is read.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Frame>
    where
        R: AsyncRead + Unpin,
    {
        let mut header_buf = [0u8; HEADER_SIZE];

        let n = read_full(reader, &mut header_buf[..1]).await?;
        if n == 0 {
            return Err(WireError::ConnectionClosed);
        }
        let tag = header_buf[0];
        if !self.registry.contains(tag) {
            return Err(WireError::UnknownPayloadType(tag));
        }

        let n = read_full(reader, &mut header_buf[1..]).await?;
        if n < HEADER_SIZE - 1 {
            return Err(WireError::TruncatedHeader { received: 1 + n });
        }
        let header = FrameHeader::decode(&header_buf).ok_or(WireError::TruncatedHeader {
            received: HEADER_SIZE,
        })?;
        header.validate(self.max_payload_size)?;

        let body = read_body(reader, header.length).await?;
        Ok(Frame::new(header, body))
    }

    /// Read and decode exactly one payload.
    pub async fn decode<R>(&self, reader: &mut R) -> Result<Box<dyn Payload>>
    where
        R: AsyncRead + Unpin,
    {
        let frame = self.read_frame(reader).await?;
        self.registry.decode(frame.header.payload_type, frame.body)
    }

    /// Decode a frame already extracted by a [`FrameBuffer`].
    pub fn decode_frame(&self, frame: Frame) -> Result<Box<dyn Payload>> {
        self.registry.decode(frame.header.payload_type, frame.body)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `buf` until it is full or the stream ends; returns bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `length` body bytes.
///
/// The buffer grows with the data actually received, not the declared length.
async fn read_body<R>(reader: &mut R, length: u32) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::with_capacity((length as usize).min(64 * 1024));
    let result = (&mut *reader)
        .take(u64::from(length))
        .read_to_end(&mut body)
        .await;

    if let Err(e) = result {
        tracing::debug!("Body read failed after {} bytes: {}", body.len(), e);
    }
    if body.len() < length as usize {
        return Err(WireError::TruncatedPayload {
            expected: length,
            received: body.len(),
        });
    }
    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{PayloadRegistryBuilder, TextPayload};
    use crate::protocol::payload_type;
    use std::io::Cursor;
    use tokio::io::duplex;

    fn text_frame(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![payload_type::TEXT];
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn test_encode_layout() {
        let bytes = FrameCodec::new().encode(&TextPayload::new("ping")).unwrap();
        assert_eq!(&bytes[..], &[2, 0, 0, 0, 4, b'p', b'i', b'n', b'g']);
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let codec = FrameCodec::new().with_max_payload(3);
        let err = codec.encode(&TextPayload::new("ping")).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { length: 4, max: 3 }));
    }

    #[test]
    fn test_max_payload_is_clamped() {
        let codec = FrameCodec::new().with_max_payload(u32::MAX);
        assert_eq!(codec.max_payload_size(), MAX_PAYLOAD_SIZE);
    }

    /// Text of exactly `len` bytes mixing 1- to 4-byte characters.
    fn mixed_utf8(len: usize) -> String {
        const CHARS: [char; 4] = ['a', 'é', '€', '𝄞'];
        let mut text = String::with_capacity(len);
        let mut i = 0;
        while text.len() < len {
            let c = CHARS[i % CHARS.len()];
            text.push(if text.len() + c.len_utf8() > len { 'a' } else { c });
            i += 1;
        }
        text
    }

    /// Deterministic arbitrary bytes (xorshift).
    fn arbitrary_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut state = seed | 1;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 24) as u8
            })
            .collect()
    }

    #[tokio::test]
    async fn test_round_trip_generated_payloads() {
        let codec = FrameCodec::new();
        let max = MAX_PAYLOAD_SIZE as usize;
        let lengths = [0, 1, 2, 3, 4, 5, 127, 128, 4095, 65_536, 1 << 20, max - 1, max];

        for (seed, &len) in lengths.iter().enumerate() {
            let text = mixed_utf8(len);
            assert_eq!(text.len(), len);

            let cases = [
                TextPayload::new(text.clone()),
                TextPayload::from(arbitrary_bytes(len, seed as u64 + 1)),
            ];
            for original in cases {
                let wire = codec.encode(&original).unwrap();
                assert_eq!(wire.len(), HEADER_SIZE + len);

                let mut reader = Cursor::new(wire);
                let decoded = codec
                    .decode(&mut reader)
                    .await
                    .unwrap()
                    .downcast::<TextPayload>()
                    .unwrap();
                assert!(decoded == original, "round trip differs at length {len}");
                assert_eq!(reader.position() as usize, HEADER_SIZE + len);
            }

            let decoded = codec
                .decode(&mut Cursor::new(codec.encode(&TextPayload::new(text.clone())).unwrap()))
                .await
                .unwrap();
            assert!(decoded.to_string() == text, "display differs at length {len}");
        }
    }

    #[tokio::test]
    async fn test_write_then_decode() {
        let codec = FrameCodec::new();
        let (mut client, mut server) = duplex(1024);

        codec.write(&mut client, &TextPayload::new("hello")).await.unwrap();
        codec.write(&mut client, &TextPayload::new("")).await.unwrap();

        let first = codec.decode(&mut server).await.unwrap();
        let second = codec.decode(&mut server).await.unwrap();
        assert_eq!(first.to_string(), "hello");
        assert_eq!(second.to_string(), "");
    }

    #[tokio::test]
    async fn test_decode_clean_eof() {
        let mut reader = Cursor::new(Vec::new());
        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_decode_unknown_tag_reads_only_tag() {
        let mut reader = Cursor::new(vec![0x09, 0, 0, 0, 1, b'x']);
        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();

        assert!(matches!(err, WireError::UnknownPayloadType(0x09)));
        assert_eq!(reader.position(), 1);
    }

    #[tokio::test]
    async fn test_decode_reserved_binary_tag_is_unknown() {
        let mut reader = Cursor::new(vec![payload_type::BINARY, 0, 0, 0, 0]);
        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();
        assert!(matches!(err, WireError::UnknownPayloadType(1)));
    }

    #[tokio::test]
    async fn test_decode_oversized_consumes_no_body() {
        let mut bytes = vec![payload_type::TEXT];
        bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        bytes.extend_from_slice(b"body bytes");
        let mut reader = Cursor::new(bytes);

        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { .. }));
        assert_eq!(reader.position(), HEADER_SIZE as u64);
    }

    #[tokio::test]
    async fn test_decode_truncated_header() {
        let mut reader = Cursor::new(vec![payload_type::TEXT, 0, 0]);
        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();
        assert!(matches!(err, WireError::TruncatedHeader { received: 3 }));
    }

    #[tokio::test]
    async fn test_decode_truncated_payload() {
        let mut bytes = text_frame(b"0123456789");
        bytes.truncate(HEADER_SIZE + 4);
        let mut reader = Cursor::new(bytes);

        let err = FrameCodec::new().decode(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            WireError::TruncatedPayload {
                expected: 10,
                received: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_decode_truncated_after_writer_drop() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&text_frame(b"abcdef")[..HEADER_SIZE + 2]).await.unwrap();
        drop(client);

        let err = FrameCodec::new().decode(&mut server).await.unwrap_err();
        assert!(matches!(err, WireError::TruncatedPayload { received: 2, .. }));
    }

    #[tokio::test]
    async fn test_write_failure_is_encode_error() {
        let (mut client, server) = duplex(64);
        drop(server);

        let err = FrameCodec::new()
            .write(&mut client, &TextPayload::new("ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Encode(_)));
    }

    #[tokio::test]
    async fn test_custom_registry() {
        let registry = PayloadRegistryBuilder::new()
            .register(0x20, "text-alias", |body| {
                Ok(Box::new(TextPayload::from_body(body)))
            })
            .build();
        let codec = FrameCodec::with_registry(Arc::new(registry));

        let mut bytes = text_frame(b"hi");
        bytes[0] = 0x20;
        let payload = codec.decode(&mut Cursor::new(bytes)).await.unwrap();
        assert_eq!(payload.to_string(), "hi");

        let err = codec
            .decode(&mut Cursor::new(text_frame(b"hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::UnknownPayloadType(2)));
    }

    #[test]
    fn test_decode_frame_from_buffer() {
        let codec = FrameCodec::new();
        let mut buffer = codec.frame_buffer();
        let frames = buffer.push(&text_frame(b"pong")).unwrap();

        let payload = codec.decode_frame(frames[0].clone()).unwrap();
        assert_eq!(payload.to_string(), "pong");
    }
}
