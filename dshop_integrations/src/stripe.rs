//! Stripe refunds.
//!
//! Each shop brings its own Stripe secret key in its configuration (`stripeBackend`). Card payments are refunded
//! against their charge or payment intent, whichever the payment reference is. Every request carries the engine's
//! idempotency key, so Stripe answers a repeated request with the original refund instead of creating another.
use async_trait::async_trait;
use dshop_engine::{
    db_types::ExternalPayment,
    shop_config::ShopConfig,
    traits::{CollaboratorError, RefundProcessor, RefundResult},
};
use log::*;
use reqwest::{header::AUTHORIZATION, Method, RequestBuilder};
use serde::Deserialize;

use crate::{
    api::{bearer, HttpClient},
    helpers::join_url,
    IntegrationError,
};

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct StripeRefundProcessor {
    client: HttpClient,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeRefundProcessor {
    pub fn new<S: Into<String>>(client: HttpClient, api_url: S) -> Self {
        Self { client, api_url: api_url.into() }
    }

    fn refund_request(
        &self,
        secret_key: &str,
        reference: &str,
        idempotency_key: &str,
    ) -> Result<RequestBuilder, IntegrationError> {
        let url = join_url(&self.api_url, "v1/refunds");
        let params = [(refund_target(reference), reference)];
        let req = self
            .client
            .request(Method::POST, &url)
            .header(AUTHORIZATION, bearer(secret_key)?)
            .header(IDEMPOTENCY_KEY, idempotency_key)
            .form(&params);
        Ok(req)
    }

    async fn create_refund(
        &self,
        secret_key: &str,
        reference: &str,
        idempotency_key: &str,
    ) -> Result<StripeRefund, IntegrationError> {
        let req = self.refund_request(secret_key, reference, idempotency_key)?;
        self.client.send_json(req).await
    }
}

#[async_trait]
impl RefundProcessor for StripeRefundProcessor {
    async fn refund(
        &self,
        config: &ShopConfig,
        payment: &ExternalPayment,
        idempotency_key: &str,
    ) -> Result<RefundResult, CollaboratorError> {
        let secret_key = config
            .stripe_backend
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| IntegrationError::NotConfigured("The shop has no Stripe secret key".into()))?;
        let reference = payment
            .payment_reference
            .as_deref()
            .ok_or_else(|| IntegrationError::RequestError("The payment has no reference".into()))?;
        match self.create_refund(secret_key.reveal(), reference, idempotency_key).await {
            Ok(refund) if refund.status == "failed" || refund.status == "canceled" => {
                let reason = refund.failure_reason.unwrap_or(refund.status);
                warn!("💸️ Stripe refund {} for {reference} did not go through. {reason}", refund.id);
                Ok(RefundResult::Declined(reason))
            },
            Ok(refund) => {
                info!("💸️ Stripe refund {} for {reference} is {}", refund.id, refund.status);
                Ok(RefundResult::Refunded)
            },
            // Stripe reports card and payment problems as 402s and 400s with a machine-readable code
            Err(IntegrationError::QueryError { status: 400 | 402, message }) => {
                let reason = decline_reason(&message);
                warn!("💸️ Stripe declined the refund for {reference}. {reason}");
                Ok(RefundResult::Declined(reason))
            },
            Err(e) => Err(e.into()),
        }
    }
}

/// Payment intents start with `pi_`; anything else is treated as a charge id.
fn refund_target(reference: &str) -> &'static str {
    if reference.starts_with("pi_") {
        "payment_intent"
    } else {
        "charge"
    }
}

/// Extracts the most specific reason Stripe gives for an error, falling back to the raw body.
fn decline_reason(body: &str) -> String {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(StripeErrorResponse { error }) => {
            error.decline_code.or(error.code).or(error.message).unwrap_or_else(|| body.to_string())
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn refund_requests_carry_the_idempotency_key() {
        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let stripe = StripeRefundProcessor::new(client, "https://api.stripe.example.com/");
        let req = stripe.refund_request("sk_test_123", "pi_3Mtw", "refund-1-001-7-1").unwrap().build().unwrap();
        assert_eq!(req.url().as_str(), "https://api.stripe.example.com/v1/refunds");
        assert_eq!(req.headers()[IDEMPOTENCY_KEY], "refund-1-001-7-1");
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer sk_test_123");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"payment_intent=pi_3Mtw");
    }

    #[test]
    fn refund_targets() {
        assert_eq!(refund_target("pi_3Mtw"), "payment_intent");
        assert_eq!(refund_target("ch_3Mtw"), "charge");
    }

    #[test]
    fn decline_reasons() {
        let body = r#"{"error": {"code": "card_declined", "decline_code": "insufficient_funds", "message": "No"}}"#;
        assert_eq!(decline_reason(body), "insufficient_funds");
        let body = r#"{"error": {"code": "charge_already_refunded", "message": "Already refunded"}}"#;
        assert_eq!(decline_reason(body), "charge_already_refunded");
        let body = r#"{"error": {"message": "Something odd"}}"#;
        assert_eq!(decline_reason(body), "Something odd");
        assert_eq!(decline_reason("Bad gateway"), "Bad gateway");
    }
}
