//! Accept loop spawning one relay session per inbound connection.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::relay;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::transport::Listener;

/// A bound relay front end.
///
/// # Example
///
/// ```ignore
/// let proxy = Proxy::bind(RelayConfig::new("127.0.0.1:9000", "127.0.0.1:9001")).await?;
/// let cancel = CancellationToken::new();
/// tokio::spawn(proxy.serve(cancel.clone()));
/// ```
pub struct Proxy {
    listener: Listener,
    config: Arc<RelayConfig>,
}

impl Proxy {
    /// Validate `config` and bind its listen address.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        config.validate()?;
        let listener = Listener::bind(config.network, &config.listen).await?;
        tracing::info!(
            "Proxy listening on {} ({}) -> {}",
            listener.local_addr()?,
            config.network,
            config.downstream
        );
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// Bound address, useful after binding port 0.
    pub fn local_addr(&self) -> Result<String> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Accept connections until `cancel` fires, then release the listener.
    ///
    /// Returns the number of sessions started. Sessions already running are
    /// not torn down by the cancellation and finish on their own. An accept
    /// failure stops the loop and is returned.
    pub async fn serve(self, cancel: CancellationToken) -> Result<u64> {
        let mut sessions = 0u64;

        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::error!("Proxy accept failed: {}", e);
                        return Err(e.into());
                    }
                },
            };

            sessions += 1;
            let id = sessions;
            let config = Arc::clone(&self.config);
            tracing::debug!("Session {} accepted from {}", id, peer);

            tokio::spawn(async move {
                match relay(stream, &config).await {
                    Ok(stats) => tracing::info!(
                        "Session {} from {} closed ({} bytes up, {} bytes down)",
                        id,
                        peer,
                        stats.inbound_to_outbound,
                        stats.outbound_to_inbound
                    ),
                    Err(e) => tracing::warn!("Session {} from {} failed: {}", id, peer, e),
                }
            });
        }

        tracing::info!("Proxy stopped after {} sessions", sessions);
        Ok(sessions)
    }
}
