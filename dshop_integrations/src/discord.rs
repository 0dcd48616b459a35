use chrono::SecondsFormat;
use dshop_engine::db_types::{Order, Shop};
use log::*;
use reqwest::Method;
use serde_json::{json, Value};

use crate::{api::HttpClient, helpers::order_headline, IntegrationError};

/// Posts order summaries to a Discord channel webhook.
#[derive(Clone)]
pub struct DiscordWebhook {
    client: HttpClient,
}

impl DiscordWebhook {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn post_new_order(
        &self,
        webhook: &str,
        shop: &Shop,
        order: &Order,
        public_url: Option<&str>,
    ) -> Result<(), IntegrationError> {
        let payload = new_order_payload(shop, order, public_url);
        self.client.send(self.client.request(Method::POST, webhook).json(&payload)).await?;
        debug!("📣️ Posted order {} to Discord", order.order_id);
        Ok(())
    }
}

pub fn new_order_payload(shop: &Shop, order: &Order, public_url: Option<&str>) -> Value {
    let mut embed = json!({
        "title": format!("New order on {}", shop.name),
        "description": order_headline(order),
        "timestamp": order.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    });
    if let Some(url) = public_url {
        embed["url"] = Value::String(format!("{}/#/admin/orders/{}", url.trim_end_matches('/'), order.order_id));
    }
    json!({ "content": format!("New order {} for {}", order.order_id, shop.name), "embeds": [embed] })
}
