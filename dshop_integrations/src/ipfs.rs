use async_trait::async_trait;
use dshop_engine::traits::{CollaboratorError, ContentFetcher};
use log::*;
use reqwest::Method;

use crate::{api::HttpClient, helpers::join_url};

/// Fetches documents from an IPFS HTTP gateway, at `<gateway>/ipfs/<hash>`.
#[derive(Clone)]
pub struct IpfsGateway {
    client: HttpClient,
}

impl IpfsGateway {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn document_url(gateway: &str, ipfs_hash: &str) -> String {
        join_url(gateway, &format!("ipfs/{}", ipfs_hash.trim()))
    }
}

#[async_trait]
impl ContentFetcher for IpfsGateway {
    async fn fetch(&self, gateway: &str, ipfs_hash: &str) -> Result<Vec<u8>, CollaboratorError> {
        let url = Self::document_url(gateway, ipfs_hash);
        trace!("⛓️ Fetching {url}");
        let bytes = self.client.send_bytes(self.client.request(Method::GET, &url)).await?;
        debug!("⛓️ Fetched {} bytes for {ipfs_hash}", bytes.len());
        Ok(bytes)
    }
}
