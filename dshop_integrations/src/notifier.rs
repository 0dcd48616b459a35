use async_trait::async_trait;
use dshop_engine::{
    db_types::{Order, Shop},
    shop_config::ShopConfig,
    traits::{CollaboratorError, NotificationDispatcher},
};
use log::*;

use crate::{discord::DiscordWebhook, sendgrid::SendGridMailer};

/// New-order notifications over email (SendGrid) and Discord.
///
/// Shops choose where notifications go in their configuration. A shop without a notification email gets no email; a
/// shop without a Discord webhook falls back to the operator's webhook, if there is one.
#[derive(Clone)]
pub struct HttpNotificationDispatcher {
    mailer: SendGridMailer,
    discord: DiscordWebhook,
    default_webhook: Option<String>,
}

impl HttpNotificationDispatcher {
    pub fn new(mailer: SendGridMailer, discord: DiscordWebhook, default_webhook: Option<String>) -> Self {
        Self { mailer, discord, default_webhook }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_new_order_email(
        &self,
        shop: &Shop,
        config: &ShopConfig,
        order: &Order,
    ) -> Result<(), CollaboratorError> {
        let Some(to) = config.email.as_deref().filter(|e| !e.trim().is_empty()) else {
            debug!("📣️ Shop #{} has no notification email. Not sending one for {}", shop.id, order.order_id);
            return Ok(());
        };
        self.mailer.send_new_order(to, shop, order).await?;
        Ok(())
    }

    async fn post_new_order_summary(
        &self,
        shop: &Shop,
        config: &ShopConfig,
        order: &Order,
    ) -> Result<(), CollaboratorError> {
        let Some(webhook) = config.discord_webhook.as_deref().or(self.default_webhook.as_deref()) else {
            trace!("📣️ No Discord webhook for shop #{}", shop.id);
            return Ok(());
        };
        self.discord.post_new_order(webhook, shop, order, config.public_url.as_deref()).await?;
        Ok(())
    }
}
