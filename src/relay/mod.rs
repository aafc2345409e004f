//! Bidirectional connection relay.
//!
//! A relay session joins an accepted inbound stream to a freshly dialed
//! downstream stream and copies bytes both ways until either side ends.
//!
//! # Architecture
//!
//! ```text
//!            ┌── pump inbound->outbound ──┐
//! inbound ───┤                            ├─── outbound
//!            └── pump outbound->inbound ──┘
//!                        │
//!                  teardown token
//! ```
//!
//! The first pump to see EOF or an error shuts down its write half and
//! cancels the teardown token; the other pump stops at its next await.
//! Bytes already forwarded are never rolled back.

mod proxy;
mod session;

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::RelayConfig;
use crate::error::{Result, WireError};
use crate::transport::{dial, Stream};

pub use proxy::Proxy;
pub use session::RelaySession;

/// Copy direction within a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    InboundToOutbound,
    OutboundToInbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::InboundToOutbound => f.write_str("inbound->outbound"),
            Direction::OutboundToInbound => f.write_str("outbound->inbound"),
        }
    }
}

/// Bytes forwarded in each direction by a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub inbound_to_outbound: u64,
    pub outbound_to_inbound: u64,
}

impl RelayStats {
    #[inline]
    pub fn total(&self) -> u64 {
        self.inbound_to_outbound + self.outbound_to_inbound
    }
}

/// Relay `inbound` to the downstream named by `config`.
///
/// If the downstream cannot be dialed, `inbound` is shut down and dropped
/// and `DownstreamUnreachable` is returned. There is no retry.
pub async fn relay<S>(mut inbound: S, config: &RelayConfig) -> Result<RelayStats>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let outbound = match dial_downstream(config).await {
        Ok(stream) => stream,
        Err(source) => {
            tracing::warn!("Failed to dial downstream {}: {}", config.downstream, source);
            let _ = inbound.shutdown().await;
            drop(inbound);
            return Err(WireError::DownstreamUnreachable {
                addr: config.downstream.clone(),
                source,
            });
        }
    };

    RelaySession::new(inbound, outbound)
        .buffer_size(config.buffer_size)
        .run()
        .await
}

async fn dial_downstream(config: &RelayConfig) -> io::Result<Stream> {
    let connect = dial(config.network, &config.downstream);
    match config.dial_timeout {
        Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("dial timed out after {limit:?}"),
            )
        })?,
        None => connect.await,
    }
}

/// Error kinds expected once the other direction has torn the session down.
pub(crate) fn is_closed_kind(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
