use std::time::Duration;

use dshop_common::Secret;
use log::*;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    /// Client-level timeout for every outgoing request
    pub http_timeout: Duration,
    pub stripe_api_url: String,
    pub sendgrid_api_url: String,
    pub sendgrid_api_key: Secret<String>,
    /// The sender address for merchant notifications
    pub email_from: String,
    /// Fallback Discord webhook for shops that don't configure their own
    pub discord_webhook: Option<String>,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            stripe_api_url: DEFAULT_STRIPE_API_URL.to_string(),
            sendgrid_api_url: DEFAULT_SENDGRID_API_URL.to_string(),
            sendgrid_api_key: Secret::default(),
            email_from: "no-reply@dshop.example.com".to_string(),
            discord_webhook: None,
        }
    }
}

impl IntegrationsConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let http_timeout = std::env::var("DSHOP_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid DSHOP_HTTP_TIMEOUT ({s}): {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);
        let stripe_api_url = std::env::var("DSHOP_STRIPE_API_URL").unwrap_or(defaults.stripe_api_url);
        let sendgrid_api_url = std::env::var("DSHOP_SENDGRID_API_URL").unwrap_or(defaults.sendgrid_api_url);
        let sendgrid_api_key = Secret::new(std::env::var("DSHOP_SENDGRID_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ DSHOP_SENDGRID_API_KEY not set. New order emails will not be sent.");
            String::default()
        }));
        let email_from = std::env::var("DSHOP_EMAIL_FROM").unwrap_or_else(|_| {
            warn!("🪛️ DSHOP_EMAIL_FROM not set, using {} as default", defaults.email_from);
            defaults.email_from
        });
        let discord_webhook = std::env::var("DSHOP_DISCORD_WEBHOOK").ok().filter(|s| !s.trim().is_empty());
        Self { http_timeout, stripe_api_url, sendgrid_api_url, sendgrid_api_key, email_from, discord_webhook }
    }
}
