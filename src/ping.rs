//! Ping/pong exchange over framed text payloads.
//!
//! The responder answers every `"ping"` text frame with a `"pong"` frame and
//! ignores anything else it can decode. The client side sends one ping and
//! measures the round trip.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::codec::FrameCodec;
use crate::error::{Result, WireError};
use crate::payload::TextPayload;
use crate::transport::Listener;

/// Request text.
pub const PING: &str = "ping";

/// Reply text.
pub const PONG: &str = "pong";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Answer pings on `stream` until the peer closes it.
///
/// Returns the number of pongs sent. A decode error ends the loop and is
/// returned; so does a stream that ends inside a frame.
pub async fn respond<S>(stream: &mut S, codec: &FrameCodec) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frame_buffer = codec.frame_buffer();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pongs = 0u64;

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            frame_buffer.finish()?;
            tracing::debug!("Ping peer closed after {} pongs", pongs);
            return Ok(pongs);
        }

        for frame in frame_buffer.push(&buf[..n])? {
            let payload = codec.decode_frame(frame)?;
            match payload.downcast_ref::<TextPayload>() {
                Some(text) if text.is(PING) => {
                    codec.write(stream, &TextPayload::new(PONG)).await?;
                    pongs += 1;
                }
                _ => tracing::debug!("Ignoring payload {:?}", payload),
            }
        }
    }
}

/// Accept connections on `listener` and answer pings on each until `cancel`.
///
/// Connections already being served are left to finish on their own.
pub async fn serve(listener: Listener, codec: FrameCodec, cancel: CancellationToken) -> Result<()> {
    tracing::info!("Ping responder listening on {}", listener.local_addr()?);

    loop {
        let (mut stream, peer) = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted?,
        };

        let codec = codec.clone();
        tokio::spawn(async move {
            match respond(&mut stream, &codec).await {
                Ok(pongs) => tracing::debug!("Ping peer {} done after {} pongs", peer, pongs),
                Err(e) => tracing::warn!("Ping peer {} failed: {}", peer, e),
            }
        });
    }

    tracing::info!("Ping responder stopped");
    Ok(())
}

/// Send one ping and wait for the pong.
///
/// Returns the round-trip time, or `UnexpectedReply` carrying the rendered
/// reply if it was anything but a pong.
pub async fn ping<S>(stream: &mut S, codec: &FrameCodec) -> Result<Duration>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start = Instant::now();
    codec.write(stream, &TextPayload::new(PING)).await?;

    let reply = codec.decode(stream).await?;
    match reply.downcast_ref::<TextPayload>() {
        Some(text) if text.is(PONG) => Ok(start.elapsed()),
        _ => Err(WireError::UnexpectedReply(reply.to_string())),
    }
}
