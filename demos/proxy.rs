//! Standalone relay.
//!
//! ```text
//! cargo run --example proxy -- 127.0.0.1:9000 127.0.0.1:9001
//! cargo run --example proxy -- --config relay.json
//! ```
//!
//! Stops accepting on Ctrl-C.

use pingwire::config::RelayConfig;
use pingwire::{Proxy, WireError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn load_config() -> pingwire::Result<RelayConfig> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag == "--config" => {
            let json = std::fs::read_to_string(path)?;
            RelayConfig::from_json_str(&json)
        }
        [listen, downstream] => Ok(RelayConfig::new(listen.as_str(), downstream.as_str())),
        _ => Err(WireError::Config(
            "usage: proxy <listen> <downstream> | proxy --config <file>".to_string(),
        )),
    }
}

#[tokio::main]
async fn main() -> pingwire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let proxy = Proxy::bind(load_config()?).await?;
    tracing::info!(
        "relaying {} -> {}",
        proxy.local_addr()?,
        proxy.config().downstream
    );

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let sessions = proxy.serve(cancel).await?;
    tracing::info!("served {} sessions", sessions);
    Ok(())
}
