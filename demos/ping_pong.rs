//! Ping/pong demo: a responder, a pinger feeding it, and an interactive
//! round trip, all on loopback.
//!
//! ```text
//! RUST_LOG=pingwire=debug cargo run --example ping_pong
//! ```

use std::time::Duration;

use pingwire::config::PingerConfig;
use pingwire::heartbeat::spawn_pinger;
use pingwire::ping;
use pingwire::transport::{dial, Listener, Network};
use pingwire::FrameCodec;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> pingwire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cancel = CancellationToken::new();
    let codec = FrameCodec::new();

    let listener = Listener::bind(Network::Tcp, "127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let responder = tokio::spawn(ping::serve(listener, codec.clone(), cancel.clone()));

    let mut stream = dial(Network::Tcp, &addr).await?;
    for _ in 0..3 {
        let rtt = ping::ping(&mut stream, &codec).await?;
        tracing::info!("pong in {:?}", rtt);
    }

    let heartbeat_stream = dial(Network::Tcp, &addr).await?;
    let (handle, pinger) = spawn_pinger(
        heartbeat_stream,
        PingerConfig::new(Duration::from_millis(500)),
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.set_interval(Duration::from_millis(100)).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    cancel.cancel();
    let report = pinger.await.map_err(std::io::Error::other)??;
    tracing::info!(
        "pinger sent {} heartbeats, final interval {:?}",
        report.ticks,
        report.interval
    );
    responder.await.map_err(std::io::Error::other)??;
    Ok(())
}
