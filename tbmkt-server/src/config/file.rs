//! TOML file configuration structures.
//!
//! These structs directly map to the `tbmkt-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on, e.g. "0.0.0.0:3000".
    pub listen: SocketAddr,
}

/// Order lifecycle and background job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Chains whose orders this instance manages.
    pub chains: Vec<String>,
    /// Seconds between staleness audit passes.
    pub audit_interval_secs: u64,
    /// Page size of the staleness audit scan.
    pub audit_batch_size: i64,
    /// Seconds between pending-cancellation expiry sweeps.
    pub expiry_interval_secs: u64,
    /// Minutes an unconfirmed cancellation request may stay pending
    /// before it reverts to ACTIVE.
    pub pending_cancellation_timeout_mins: i64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            chains: vec!["solana".to_string()],
            audit_interval_secs: 3600,
            audit_batch_size: 10_000,
            expiry_interval_secs: 1800,
            pending_cancellation_timeout_mins: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:3000"
        "#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.marketplace.chains, vec!["solana"]);
        assert_eq!(config.marketplace.audit_interval_secs, 3600);
        assert_eq!(config.marketplace.pending_cancellation_timeout_mins, 30);
    }

    #[test]
    fn marketplace_section_overrides_defaults() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:8080"

            [marketplace]
            chains = ["solana", "eclipse"]
            audit_interval_secs = 600
            audit_batch_size = 500
            expiry_interval_secs = 60
            pending_cancellation_timeout_mins = 10
        "#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.marketplace.chains.len(), 2);
        assert_eq!(config.marketplace.audit_batch_size, 500);
        assert_eq!(config.marketplace.expiry_interval_secs, 60);
    }
}
