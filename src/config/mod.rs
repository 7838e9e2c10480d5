//! Client configuration
//!
//! Configuration is an explicit value handed to `GraphNodeClient::connect`.
//! Nothing is read from the process environment unless the caller asks for it
//! with [`GraphNodeConfig::from_env`].

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

const TESTNET_RPC_URL: &str = "https://testnet.example.com";
const MAINNET_RPC_URL: &str = "https://mainnet.example.com";

/// Network the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
    /// Any other RPC endpoint, e.g. a local development chain
    Custom(String),
}

impl Network {
    /// RPC endpoint for this network
    pub fn rpc_url(&self) -> &str {
        match self {
            Network::Testnet => TESTNET_RPC_URL,
            Network::Mainnet => MAINNET_RPC_URL,
            Network::Custom(url) => url,
        }
    }

    /// Parse `testnet`, `mainnet` or an `http(s)://` URL
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Network::Custom(raw.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidValue {
                field: "network",
                reason: format!("expected testnet, mainnet or an http(s) URL, got {raw:?}"),
            }),
        }
    }
}

/// Settings resolved once when a client is constructed
///
/// | Variable | Field |
/// |----------|-------|
/// | `GRAPH_NETWORK` | `network` (`testnet`, `mainnet` or a URL) |
/// | `PRIVATE_KEY` | `private_key` |
/// | `NODE_ADDRESS` | `node_address` |
/// | `NODE_TYPE_REGISTRY_ADDRESS` | `node_type_registry_address` |
/// | `GRAPH_DEBUG` | `debug` (`1`/`true`) |
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphNodeConfig {
    pub network: Network,
    pub private_key: Option<String>,
    pub node_address: Option<String>,
    pub node_type_registry_address: Option<String>,
    pub debug: bool,
}

impl GraphNodeConfig {
    /// Populate a config from the variables in the table above
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let network = match lookup("GRAPH_NETWORK") {
            Some(raw) => Network::parse(&raw)?,
            None => Network::default(),
        };

        let debug = lookup("GRAPH_DEBUG")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            network,
            private_key: non_empty("PRIVATE_KEY"),
            node_address: non_empty("NODE_ADDRESS"),
            node_type_registry_address: non_empty("NODE_TYPE_REGISTRY_ADDRESS"),
            debug,
        })
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn with_node_address(mut self, address: impl Into<String>) -> Self {
        self.node_address = Some(address.into());
        self
    }

    pub fn with_registry_address(mut self, address: impl Into<String>) -> Self {
        self.node_type_registry_address = Some(address.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl fmt::Debug for GraphNodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNodeConfig")
            .field("network", &self.network)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("node_address", &self.node_address)
            .field("node_type_registry_address", &self.node_type_registry_address)
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GraphNodeConfig::default();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.network.rpc_url(), "https://testnet.example.com");
        assert!(config.private_key.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = GraphNodeConfig::from_lookup(lookup_from(&[
            ("GRAPH_NETWORK", "mainnet"),
            ("PRIVATE_KEY", "0xabc"),
            ("NODE_ADDRESS", ""),
            ("NODE_TYPE_REGISTRY_ADDRESS", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("GRAPH_DEBUG", "true"),
        ]))
        .unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.private_key.as_deref(), Some("0xabc"));
        assert!(config.node_address.is_none());
        assert!(config.node_type_registry_address.is_some());
        assert!(config.debug);
    }

    #[test]
    fn test_invalid_network_is_rejected() {
        let result = GraphNodeConfig::from_lookup(lookup_from(&[("GRAPH_NETWORK", "devnet")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "network", .. })
        ));
    }

    #[test]
    fn test_custom_network_url() {
        let network = Network::parse("http://localhost:8545").unwrap();
        assert_eq!(network.rpc_url(), "http://localhost:8545");
    }

    #[test]
    fn test_debug_output_redacts_private_key() {
        let config = GraphNodeConfig::default().with_private_key("super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let config: GraphNodeConfig = serde_json::from_value(serde_json::json!({
            "network": "mainnet",
            "debug": true
        }))
        .unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert!(config.debug);
        assert!(config.node_address.is_none());
    }
}
