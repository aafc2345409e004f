//! Codec module - translation between payloads and framed byte streams.
//!
//! [`FrameCodec`] writes `[type][length BE][body]` frames and reads them
//! back through a [`PayloadRegistry`](crate::payload::PayloadRegistry).
//!
//! # Example
//!
//! ```
//! use pingwire::codec::FrameCodec;
//! use pingwire::payload::TextPayload;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> pingwire::Result<()> {
//! let codec = FrameCodec::new();
//! let (mut client, mut server) = tokio::io::duplex(64);
//!
//! codec.write(&mut client, &TextPayload::new("ping")).await?;
//! let payload = codec.decode(&mut server).await?;
//! assert_eq!(payload.to_string(), "ping");
//! # Ok(())
//! # }
//! ```

mod frame_codec;

pub use frame_codec::FrameCodec;
