//! The decrypted order payload, as written by the buyer's client and enriched by the engine.
//!
//! Only the fields the engine reads or stamps are typed. Everything else the client sends is kept in `extra` so that
//! the stored payload round-trips without loss.
use dshop_common::MinorUnits;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: MinorUnits,
    #[serde(default)]
    pub sub_total: MinorUnits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Set when the discount attached to the order turned out to be invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a refund was attempted and failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_error: Option<String>,
    /// Stamped by the engine: the fully-qualified offer id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
    /// Stamped by the engine: the hash of the transaction that created the offer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub price: MinorUnits,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl OrderData {
    /// The payment method id, if one was supplied.
    pub fn payment_method_id(&self) -> Option<&str> {
        self.payment_method.as_ref().map(|m| m.id.as_str())
    }

    /// A short human-readable summary of the items, e.g. `2 x T-shirt, 1 x Mug`.
    pub fn items_summary(&self) -> String {
        self.items.iter().map(|i| format!("{} x {}", i.quantity, i.title)).collect::<Vec<_>>().join(", ")
    }
}
