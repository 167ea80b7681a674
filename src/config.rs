//! dnsprox configuration

use crate::tunnel_domain::TunnelDomain;
use crate::{DnsproxError, Result};
use serde::{Deserialize, Serialize};

fn default_queue_capacity() -> usize {
    1024
}

/// Tunnel server configuration
///
/// ```toml
/// domain = "tunnel.example.com"
/// listen_addr = "0.0.0.0:53"
/// payload_size = 16
/// queue_capacity = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Parent domain of tunnel queries, dotted form
    pub domain: String,

    /// UDP listen address (host:port)
    pub listen_addr: String,

    /// Raw payload size in bytes carried by each query
    pub payload_size: u8,

    /// Capacity of the parsed request channel
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            domain: "tunnel.example.com".to_string(),
            listen_addr: "0.0.0.0:53".to_string(),
            payload_size: 16,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl TunnelConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        TunnelDomain::parse(&self.domain)?;

        if self.listen_addr.is_empty() {
            return Err(DnsproxError::InvalidConfig("listen_addr must be set".into()));
        }

        if self.payload_size == 0 {
            return Err(DnsproxError::InvalidConfig(
                "payload_size must be at least 1".into(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(DnsproxError::InvalidConfig(
                "queue_capacity must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
