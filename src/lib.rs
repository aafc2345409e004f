//! # pingwire
//!
//! Typed payload framing over async byte streams, a bidirectional
//! connection relay, and an adaptive heartbeat generator.
//!
//! ## Architecture
//!
//! - **Framing**: `[type u8][length u32 BE][body]`, decoded through a
//!   read-only payload registry
//! - **Heartbeat**: periodic text frames with a live-adjustable interval
//! - **Relay**: two independent byte pumps per session behind a TCP or Unix
//!   accept loop
//!
//! ## Example
//!
//! ```ignore
//! use pingwire::config::PingerConfig;
//! use pingwire::heartbeat::spawn_pinger;
//! use pingwire::transport::{dial, Network};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> pingwire::Result<()> {
//!     let stream = dial(Network::Tcp, "127.0.0.1:7000").await?;
//!     let cancel = CancellationToken::new();
//!     let (handle, task) = spawn_pinger(stream, PingerConfig::default(), cancel.clone());
//!
//!     handle.set_interval(std::time::Duration::from_secs(1)).await?;
//!     tokio::signal::ctrl_c().await?;
//!     cancel.cancel();
//!     task.await.map_err(std::io::Error::other)??;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod payload;
pub mod ping;
pub mod protocol;
pub mod relay;
pub mod transport;

pub use codec::FrameCodec;
pub use error::{Result, WireError};
pub use heartbeat::{spawn_pinger, Pinger, PingerHandle, PingerReport};
pub use payload::{Payload, PayloadRegistry, TextPayload};
pub use relay::{relay, Proxy, RelaySession, RelayStats};
