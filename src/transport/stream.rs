//! Connected streams and listeners over TCP or Unix domain sockets.
//!
//! # Example
//!
//! ```ignore
//! use pingwire::transport::{dial, Listener, Network};
//!
//! let listener = Listener::bind(Network::Tcp, "127.0.0.1:0").await?;
//! let addr = listener.local_addr()?;
//! let client = dial(Network::Tcp, &addr).await?;
//! let (server, peer) = listener.accept().await?;
//! ```

use std::fmt;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};

/// Address family used to dial and listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// `host:port`
    Tcp,
    /// Filesystem socket path.
    Unix,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => f.write_str("tcp"),
            Network::Unix => f.write_str("unix"),
        }
    }
}

impl FromStr for Network {
    type Err = io::Error;

    fn from_str(s: &str) -> io::Result<Self> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "unix" => Ok(Network::Unix),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported network {other:?}"),
            )),
        }
    }
}

#[cfg(not(unix))]
fn unix_unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "unix sockets are not available on this platform",
    )
}

/// A connected byte stream.
#[derive(Debug)]
pub enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Stream {
    /// Peer address as a display string.
    pub fn peer_addr(&self) -> io::Result<String> {
        match self {
            Stream::Tcp(s) => Ok(s.peer_addr()?.to_string()),
            #[cfg(unix)]
            Stream::Unix(s) => Ok(format!("{:?}", s.peer_addr()?)),
        }
    }
}

impl From<TcpStream> for Stream {
    fn from(stream: TcpStream) -> Self {
        Stream::Tcp(stream)
    }
}

#[cfg(unix)]
impl From<tokio::net::UnixStream> for Stream {
    fn from(stream: tokio::net::UnixStream) -> Self {
        Stream::Unix(stream)
    }
}

/// Dial `addr` over `network`.
pub async fn dial(network: Network, addr: &str) -> io::Result<Stream> {
    match network {
        Network::Tcp => {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(Stream::Tcp(stream))
        }
        #[cfg(unix)]
        Network::Unix => Ok(Stream::Unix(tokio::net::UnixStream::connect(addr).await?)),
        #[cfg(not(unix))]
        Network::Unix => Err(unix_unsupported()),
    }
}

/// A bound listener.
///
/// A Unix listener removes its socket file when dropped.
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: tokio::net::UnixListener,
        path: String,
    },
}

impl Listener {
    /// Bind to `addr`.
    ///
    /// For Unix sockets an existing file at the path is removed first.
    pub async fn bind(network: Network, addr: &str) -> io::Result<Self> {
        match network {
            Network::Tcp => Ok(Listener::Tcp(TcpListener::bind(addr).await?)),
            #[cfg(unix)]
            Network::Unix => {
                if std::path::Path::new(addr).exists() {
                    std::fs::remove_file(addr)?;
                }
                let listener = tokio::net::UnixListener::bind(addr)?;
                Ok(Listener::Unix {
                    listener,
                    path: addr.to_string(),
                })
            }
            #[cfg(not(unix))]
            Network::Unix => Err(unix_unsupported()),
        }
    }

    /// Accept one connection, returning it with a printable peer address.
    pub async fn accept(&self) -> io::Result<(Stream, String)> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok((Stream::Tcp(stream), peer.to_string()))
            }
            #[cfg(unix)]
            Listener::Unix { listener, path } => {
                let (stream, _peer) = listener.accept().await?;
                Ok((Stream::Unix(stream), format!("unix:{path}")))
            }
        }
    }

    /// Address this listener is bound to, in a form [`dial`] accepts.
    pub fn local_addr(&self) -> io::Result<String> {
        match self {
            Listener::Tcp(listener) => Ok(listener.local_addr()?.to_string()),
            #[cfg(unix)]
            Listener::Unix { path, .. } => Ok(path.clone()),
        }
    }

    pub fn network(&self) -> Network {
        match self {
            Listener::Tcp(_) => Network::Tcp,
            #[cfg(unix)]
            Listener::Unix { .. } => Network::Unix,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Listener::Unix { path, .. } = self {
            let _ = std::fs::remove_file(path.as_str());
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}
