//! Transport module - TCP and Unix domain socket streams.
//!
//! Provides abstraction over:
//! - TCP (`host:port`)
//! - Unix Domain Sockets (Linux/macOS)

mod stream;

pub use stream::{dial, Listener, Network, Stream};
