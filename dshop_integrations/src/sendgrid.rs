use dshop_common::Secret;
use dshop_engine::db_types::{Order, Shop};
use log::*;
use reqwest::{header::AUTHORIZATION, Method};
use serde_json::{json, Value};

use crate::{
    api::{bearer, HttpClient},
    helpers::{items_and_total, join_url},
    IntegrationError,
};

/// Sends merchant notifications through the SendGrid v3 mail API.
#[derive(Clone)]
pub struct SendGridMailer {
    client: HttpClient,
    api_url: String,
    api_key: Secret<String>,
    from: String,
}

impl SendGridMailer {
    pub fn new<S: Into<String>>(client: HttpClient, api_url: S, api_key: Secret<String>, from: S) -> Self {
        Self { client, api_url: api_url.into(), api_key, from: from.into() }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn send_new_order(&self, to: &str, shop: &Shop, order: &Order) -> Result<(), IntegrationError> {
        if !self.is_configured() {
            return Err(IntegrationError::NotConfigured("No SendGrid API key".into()));
        }
        let url = join_url(&self.api_url, "v3/mail/send");
        let payload = new_order_email(&self.from, to, shop, order);
        let req = self.client.request(Method::POST, &url).header(AUTHORIZATION, bearer(self.api_key.reveal())?);
        self.client.send(req.json(&payload)).await?;
        info!("📣️ New order email for {} sent to {to}", order.order_id);
        Ok(())
    }
}

pub fn new_order_email(from: &str, to: &str, shop: &Shop, order: &Order) -> Value {
    let mut lines = vec![
        format!("You have a new order on {}.", shop.name),
        String::new(),
        format!("Order: {}", order.order_id),
        format!("Items: {}", items_and_total(&order.data)),
    ];
    if let Some(method) = &order.data.payment_method {
        lines.push(format!("Payment method: {}", method.label));
    }
    if let Some(error) = &order.data.error {
        lines.push(format!("Attention: {error}"));
    }
    json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": from, "name": shop.name },
        "subject": format!("[{}] New order {}", shop.name, order.order_id),
        "content": [{ "type": "text/plain", "value": lines.join("\n") }],
    })
}
