//! Gateway configuration.
//!
//! The full configuration (listen address, node connection, scrape
//! settings) loads from a JSON file named by the `EXPORTER_CONFIG`
//! environment variable; without it, everything falls back to defaults
//! aimed at a local node.

use std::net::SocketAddr;

use serde::Deserialize;

use exporter::{NodeConfig, ScrapeConfig};

/// Configuration for the gateway HTTP server and its scrape engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Upstream node connection settings.
    pub node: NodeConfig,
    /// What to scrape and how to label it.
    pub scrape: ScrapeConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Safe to unwrap: fixed, valid address literal. Bind to all
        // interfaces so the exporter is reachable through container
        // port mappings.
        let addr: SocketAddr = "0.0.0.0:9300"
            .parse()
            .expect("hard-coded listen address should parse");
        Self {
            listen_addr: addr,
            node: NodeConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Loads the configuration from `EXPORTER_CONFIG`, or defaults when
    /// the variable is unset.
    pub fn load() -> Result<Self, String> {
        let Ok(path) = std::env::var("EXPORTER_CONFIG") else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read config file {path}: {e}"))?;
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse config file {path}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_all_interfaces() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr.port(), 9300);
        assert_eq!(config.node.lcd_url, "http://localhost:1317");
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"scrape": {"prefix": "sei", "validators": ["seivaloper1xyz"], "votes": true}}"#,
        )
        .expect("parses");
        assert_eq!(config.listen_addr.port(), 9300);
        assert_eq!(config.scrape.prefix, "sei");
        assert!(config.scrape.votes);
        assert_eq!(config.scrape.validators.len(), 1);
    }
}
