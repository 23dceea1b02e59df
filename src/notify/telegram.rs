use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::User;
use crate::notify::{ChannelKind, Delivery, NotificationChannel, NotificationEvent, NotifyError};

/// Telegram stub. Users without a messaging handle on file are skipped.
pub struct TelegramChannel;

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    #[instrument(name = "telegram_channel", fields(user_id = %user.id), skip(self, event, user))]
    async fn deliver(
        &self,
        event: &NotificationEvent,
        user: &User,
    ) -> Result<Delivery, NotifyError> {
        if !user.can_receive_telegram() {
            return Ok(Delivery::Skipped);
        }
        let handle = user.messaging_handle.as_deref().unwrap_or("");

        match event {
            NotificationEvent::NewOrder { order } => {
                info!(handle, order_id = %order.id, total = %order.total, "Order confirmation via Telegram");
            }
            NotificationEvent::StatusChange { order, previous } => {
                info!(
                    handle,
                    order_id = %order.id,
                    from = %previous,
                    to = %order.status,
                    "Order status via Telegram"
                );
            }
            NotificationEvent::Message { subject, .. } => {
                info!(handle, subject = %subject, "Telegram message");
            }
        }
        Ok(Delivery::Sent)
    }
}
