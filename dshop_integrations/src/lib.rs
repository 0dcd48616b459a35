//! HTTP implementations of the dshop engine's collaborator traits.
//!
//! [`Integrations::new`] builds the full set from an [`IntegrationsConfig`] and hands back the pieces the engine's
//! `Collaborators` bundle needs.
mod api;
mod config;
mod discord;
mod error;
mod helpers;
mod ipfs;
mod notifier;
mod sendgrid;
mod stripe;

pub use api::HttpClient;
pub use config::IntegrationsConfig;
pub use discord::DiscordWebhook;
pub use error::IntegrationError;
pub use ipfs::IpfsGateway;
pub use notifier::HttpNotificationDispatcher;
pub use sendgrid::SendGridMailer;
pub use stripe::StripeRefundProcessor;

/// The HTTP-backed collaborators, sharing one client.
#[derive(Clone)]
pub struct Integrations {
    pub content: IpfsGateway,
    pub refunds: StripeRefundProcessor,
    pub notifier: HttpNotificationDispatcher,
}

impl Integrations {
    pub fn new(config: IntegrationsConfig) -> Result<Self, IntegrationError> {
        let client = HttpClient::new(config.http_timeout)?;
        let content = IpfsGateway::new(client.clone());
        let refunds = StripeRefundProcessor::new(client.clone(), config.stripe_api_url);
        let mailer =
            SendGridMailer::new(client.clone(), config.sendgrid_api_url, config.sendgrid_api_key, config.email_from);
        let notifier = HttpNotificationDispatcher::new(mailer, DiscordWebhook::new(client), config.discord_webhook);
        Ok(Self { content, refunds, notifier })
    }
}
