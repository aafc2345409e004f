//! One relay session: two pump tasks joined by a teardown token.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::{is_closed_kind, Direction, RelayStats};
use crate::config::DEFAULT_RELAY_BUFFER_SIZE;
use crate::error::{Result, WireError};

/// Relay between two connected streams.
///
/// The session owns both legs. Each leg is closed once, after both pumps
/// have returned and dropped their halves.
pub struct RelaySession<A, B> {
    inbound: A,
    outbound: B,
    buffer_size: usize,
}

/// What a pump reports when it returns.
struct PumpOutcome {
    bytes: u64,
    error: Option<io::Error>,
}

impl<A, B> RelaySession<A, B>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(inbound: A, outbound: B) -> Self {
        Self {
            inbound,
            outbound,
            buffer_size: DEFAULT_RELAY_BUFFER_SIZE,
        }
    }

    /// Copy buffer size per direction (at least one byte).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Run both directions to completion.
    ///
    /// Returns the byte counts, or `Relay` for the first direction that
    /// failed with an error not explained by the teardown itself.
    pub async fn run(self) -> Result<RelayStats> {
        let (inbound_read, inbound_write) = tokio::io::split(self.inbound);
        let (outbound_read, outbound_write) = tokio::io::split(self.outbound);
        let teardown = CancellationToken::new();

        tracing::debug!("Relay session started");

        let upstream = tokio::spawn(pump(
            Direction::InboundToOutbound,
            inbound_read,
            outbound_write,
            self.buffer_size,
            teardown.clone(),
        ));
        let downstream = tokio::spawn(pump(
            Direction::OutboundToInbound,
            outbound_read,
            inbound_write,
            self.buffer_size,
            teardown,
        ));

        let (upstream, downstream) = tokio::join!(upstream, downstream);
        let upstream = upstream.map_err(|e| WireError::Io(io::Error::other(e)))?;
        let downstream = downstream.map_err(|e| WireError::Io(io::Error::other(e)))?;

        let stats = RelayStats {
            inbound_to_outbound: upstream.bytes,
            outbound_to_inbound: downstream.bytes,
        };
        tracing::debug!(
            "Relay session closed ({} bytes in->out, {} bytes out->in)",
            stats.inbound_to_outbound,
            stats.outbound_to_inbound
        );

        for (direction, outcome) in [
            (Direction::InboundToOutbound, upstream),
            (Direction::OutboundToInbound, downstream),
        ] {
            if let Some(source) = outcome.error {
                return Err(WireError::Relay { direction, source });
            }
        }
        Ok(stats)
    }
}

/// Copy `reader` into `writer` until EOF, an error, or teardown.
async fn pump<R, W>(
    direction: Direction,
    mut reader: R,
    mut writer: W,
    buffer_size: usize,
    teardown: CancellationToken,
) -> PumpOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let mut bytes = 0u64;

    let result: io::Result<()> = loop {
        let n = tokio::select! {
            biased;
            _ = teardown.cancelled() => break Ok(()),
            read = reader.read(&mut buf) => match read {
                Ok(0) => break Ok(()),
                Ok(n) => n,
                Err(e) => break Err(e),
            },
        };

        let written = tokio::select! {
            biased;
            _ = teardown.cancelled() => break Ok(()),
            written = write_chunk(&mut writer, &buf[..n]) => written,
        };
        if let Err(e) = written {
            break Err(e);
        }
        bytes += n as u64;
    };

    let error = match result {
        Ok(()) => None,
        Err(e) if teardown.is_cancelled() && is_closed_kind(&e) => {
            tracing::trace!("Relay {} closed after teardown: {}", direction, e);
            None
        }
        Err(e) => {
            tracing::warn!("Relay {} failed after {} bytes: {}", direction, bytes, e);
            Some(e)
        }
    };

    if let Err(e) = writer.shutdown().await {
        tracing::trace!("Relay {} shutdown: {}", direction, e);
    }
    teardown.cancel();

    PumpOutcome { bytes, error }
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}
