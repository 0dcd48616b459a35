//! Per-network context.
//!
//! There is no global contract client. Everything the engine needs to know about a network travels in a
//! [`NetworkContext`], looked up from a [`NetworkRegistry`] by network id and passed explicitly to every call.
use std::{collections::HashMap, env, path::Path};

use alloy_primitives::Address;
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    pub network_id: i64,
    /// JSON-RPC endpoint. Informational: the engine never calls it directly.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Default content-storage gateway for shops that don't configure their own
    pub ipfs_gateway: String,
    /// Marketplace contract address, keyed by contract version (e.g. `001`)
    #[serde(default)]
    pub marketplace_contracts: HashMap<String, Address>,
}

impl NetworkContext {
    pub fn new<S: Into<String>>(network_id: i64, ipfs_gateway: S) -> Self {
        Self { network_id, rpc_url: None, ipfs_gateway: ipfs_gateway.into(), marketplace_contracts: HashMap::new() }
    }

    pub fn with_rpc_url<S: Into<String>>(mut self, url: S) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn with_marketplace_contract<S: Into<String>>(mut self, version: S, address: Address) -> Self {
        self.marketplace_contracts.insert(version.into(), address);
        self
    }

    pub fn marketplace_contract(&self, version: &str) -> Option<Address> {
        self.marketplace_contracts.get(version).copied()
    }
}

#[derive(Debug, Clone, Error)]
pub enum NetworkConfigError {
    #[error("Could not read the network configuration file. {0}")]
    Io(String),
    #[error("Invalid network configuration. {0}")]
    InvalidJson(String),
}

/// All the networks the engine knows about.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: HashMap<i64, NetworkContext>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network: NetworkContext) -> Self {
        self.networks.insert(network.network_id, network);
        self
    }

    pub fn get(&self, network_id: i64) -> Option<&NetworkContext> {
        self.networks.get(&network_id)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Parses a JSON array of network contexts.
    pub fn from_json(json: &str) -> Result<Self, NetworkConfigError> {
        let networks = serde_json::from_str::<Vec<NetworkContext>>(json)
            .map_err(|e| NetworkConfigError::InvalidJson(e.to_string()))?;
        Ok(networks.into_iter().fold(Self::new(), |reg, n| reg.with_network(n)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NetworkConfigError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| NetworkConfigError::Io(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Loads the registry from `DSHOP_NETWORKS`, which may hold either the JSON itself or a path to a JSON file.
    pub fn from_env_or_default() -> Self {
        let Ok(value) = env::var("DSHOP_NETWORKS") else {
            warn!("🪛️ DSHOP_NETWORKS is not set. No networks are configured, so every event will be rejected.");
            return Self::default();
        };
        let result =
            if value.trim_start().starts_with('[') { Self::from_json(&value) } else { Self::from_file(value.trim()) };
        result.unwrap_or_else(|e| {
            error!("🪛️ Could not load the network registry from DSHOP_NETWORKS. {e}");
            Self::default()
        })
    }
}
