//! Configuration for the heartbeat generator and the relay.
//!
//! Both configs have sensible defaults, fluent setters, and can be loaded
//! from JSON:
//!
//! ```
//! use pingwire::config::RelayConfig;
//! use pingwire::transport::Network;
//!
//! let config = RelayConfig::from_json_str(
//!     r#"{ "listen": "127.0.0.1:9000", "downstream": "127.0.0.1:9001" }"#,
//! ).unwrap();
//! assert_eq!(config.network, Network::Tcp);
//! assert_eq!(config.downstream, "127.0.0.1:9001");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};
use crate::transport::Network;

/// Default heartbeat interval.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Default heartbeat message.
pub const DEFAULT_PING_MESSAGE: &str = "ping";

/// Default relay copy buffer size per direction.
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 32 * 1024;

/// Configuration for the heartbeat generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingerConfig {
    /// Interval between heartbeats. Zero means [`DEFAULT_PING_INTERVAL`].
    pub interval: Duration,
    /// Text sent in each heartbeat frame.
    pub message: String,
}

impl PingerConfig {
    pub fn new(interval: Duration) -> Self {
        Self::default().interval(interval)
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The interval actually used, applying the zero fallback.
    pub fn effective_interval(&self) -> Duration {
        if self.interval.is_zero() {
            DEFAULT_PING_INTERVAL
        } else {
            self.interval
        }
    }

    /// Parse from a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PING_INTERVAL,
            message: DEFAULT_PING_MESSAGE.to_string(),
        }
    }
}

/// Configuration for the relay and the proxy accept loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address family for both the listener and the downstream dial.
    pub network: Network,
    /// Address the proxy listens on.
    pub listen: String,
    /// Downstream target every session dials.
    pub downstream: String,
    /// Copy buffer size per direction.
    pub buffer_size: usize,
    /// Limit on the downstream dial; `None` waits for the OS.
    pub dial_timeout: Option<Duration>,
}

impl RelayConfig {
    pub fn new(listen: impl Into<String>, downstream: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            downstream: downstream.into(),
            ..Self::default()
        }
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    /// Parse from a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the addresses are set and the buffer is usable.
    pub fn validate(&self) -> Result<()> {
        if self.downstream.is_empty() {
            return Err(WireError::Config("downstream address is empty".to_string()));
        }
        if self.listen.is_empty() {
            return Err(WireError::Config("listen address is empty".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(WireError::Config("buffer_size must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            listen: "127.0.0.1:0".to_string(),
            downstream: String::new(),
            buffer_size: DEFAULT_RELAY_BUFFER_SIZE,
            dial_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinger_config_default() {
        let config = PingerConfig::default();
        assert_eq!(config.interval, DEFAULT_PING_INTERVAL);
        assert_eq!(config.message, "ping");
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let config = PingerConfig::new(Duration::ZERO);
        assert_eq!(config.effective_interval(), DEFAULT_PING_INTERVAL);

        let config = PingerConfig::new(Duration::from_millis(250));
        assert_eq!(config.effective_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_pinger_config_from_json() {
        let config = PingerConfig::from_json_str(
            r#"{ "interval": { "secs": 2, "nanos": 0 }, "message": "hb" }"#,
        )
        .unwrap();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.message, "hb");

        let config = PingerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PingerConfig::default());
    }

    #[test]
    fn test_relay_config_builder() {
        let config = RelayConfig::new("127.0.0.1:7000", "127.0.0.1:7001")
            .buffer_size(1024)
            .dial_timeout(Duration::from_secs(3));

        assert_eq!(config.network, Network::Tcp);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.dial_timeout, Some(Duration::from_secs(3)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relay_config_validation() {
        let err = RelayConfig::from_json_str(r#"{ "listen": "127.0.0.1:0" }"#).unwrap_err();
        assert!(err.to_string().contains("downstream address is empty"));

        let err = RelayConfig::new("a", "b").buffer_size(0).validate().unwrap_err();
        assert!(matches!(err, WireError::Config(_)));
    }

    #[test]
    fn test_relay_config_unix_network() {
        let config = RelayConfig::from_json_str(
            r#"{ "network": "unix", "listen": "/tmp/a.sock", "downstream": "/tmp/b.sock" }"#,
        )
        .unwrap();
        assert_eq!(config.network, Network::Unix);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = PingerConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, WireError::Config(_)));
    }
}
