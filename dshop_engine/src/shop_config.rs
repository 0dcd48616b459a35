//! Shop configuration.
//!
//! Every shop carries a configuration blob in its database row (gateway keys, notification settings and so on), and a
//! staged deployment configuration, `<data_dir>/config.json`, that the shop front-end is built from. The engine reads
//! the former and writes exactly one thing into the latter: the listing id, once the shop's listing is created.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dshop_common::Secret;
use log::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    db_types::{ListingId, Shop},
    traits::ShopConfigStore,
};

pub const STAGED_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Error)]
pub enum ShopConfigError {
    #[error("Could not access the shop configuration. {0}")]
    Io(String),
    #[error("The shop configuration is not valid JSON. {0}")]
    InvalidJson(String),
    #[error("The shop configuration has an unexpected shape. {0}")]
    InvalidStructure(String),
}

impl From<std::io::Error> for ShopConfigError {
    fn from(e: std::io::Error) -> Self {
        ShopConfigError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ShopConfigError {
    fn from(e: serde_json::Error) -> Self {
        ShopConfigError::InvalidJson(e.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopConfig {
    /// Overrides the network's default content gateway
    #[serde(default)]
    pub ipfs_gateway: Option<String>,
    /// The shop's Stripe secret key
    #[serde(default)]
    pub stripe_backend: Option<Secret<String>>,
    /// Send new orders to the fulfillment service as soon as they are created
    #[serde(default)]
    pub auto_fulfill: bool,
    #[serde(default)]
    pub discord_webhook: Option<String>,
    /// Where new-order notifications for the merchant go
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShopConfig {
    pub fn parse(config: &str) -> Result<Self, ShopConfigError> {
        if config.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(config)?)
    }

    /// The shop's content gateway if it has one, otherwise `default`.
    pub fn gateway_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.ipfs_gateway.as_deref() {
            Some(g) if !g.trim().is_empty() => g,
            _ => default,
        }
    }
}

/// Writes `listing_id` into `networks.<network_id>.listingId`, creating the intermediate objects if necessary.
pub fn patch_listing_id(config: &mut Value, network_id: i64, listing_id: &ListingId) -> Result<(), ShopConfigError> {
    let root = config
        .as_object_mut()
        .ok_or_else(|| ShopConfigError::InvalidStructure("The top level is not an object".into()))?;
    let networks = root.entry("networks").or_insert_with(|| Value::Object(Map::new()));
    let networks = networks
        .as_object_mut()
        .ok_or_else(|| ShopConfigError::InvalidStructure("`networks` is not an object".into()))?;
    let network = networks.entry(network_id.to_string()).or_insert_with(|| Value::Object(Map::new()));
    let network = network
        .as_object_mut()
        .ok_or_else(|| ShopConfigError::InvalidStructure(format!("`networks.{network_id}` is not an object")))?;
    network.insert("listingId".into(), Value::String(listing_id.to_string()));
    Ok(())
}

/// Reads shop configuration from the shop record and patches the staged `config.json` on disk.
#[derive(Debug, Clone)]
pub struct FileShopConfigStore {
    root: PathBuf,
}

impl FileShopConfigStore {
    /// `root` is the directory that shop data directories are relative to.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn staged_config_path(&self, shop: &Shop) -> PathBuf {
        self.root.join(&shop.data_dir).join(STAGED_CONFIG_FILE)
    }
}

#[async_trait]
impl ShopConfigStore for FileShopConfigStore {
    async fn load(&self, shop: &Shop) -> Result<ShopConfig, ShopConfigError> {
        ShopConfig::parse(&shop.config)
    }

    async fn patch_listing_id(
        &self,
        shop: &Shop,
        network_id: i64,
        listing_id: &ListingId,
    ) -> Result<(), ShopConfigError> {
        let path = self.staged_config_path(shop);
        let contents = tokio::fs::read_to_string(&path).await?;
        let mut config = serde_json::from_str::<Value>(&contents)?;
        patch_listing_id(&mut config, network_id, listing_id)?;
        let patched = serde_json::to_string_pretty(&config)?;
        tokio::fs::write(&path, patched).await?;
        debug!("🏷️ Wrote listing id {listing_id} to {}", path.display());
        Ok(())
    }
}
