use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::User;
use crate::notify::{ChannelKind, Delivery, NotificationChannel, NotificationEvent, NotifyError};

/// WhatsApp stub. Users without a phone number on file are skipped.
pub struct WhatsAppChannel;

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    #[instrument(name = "whatsapp_channel", fields(user_id = %user.id), skip(self, event, user))]
    async fn deliver(
        &self,
        event: &NotificationEvent,
        user: &User,
    ) -> Result<Delivery, NotifyError> {
        if !user.can_receive_whatsapp() {
            return Ok(Delivery::Skipped);
        }
        let phone = user.phone.as_deref().unwrap_or("");

        match event {
            NotificationEvent::NewOrder { order } => {
                info!(phone, order_id = %order.id, total = %order.total, "Order confirmation via WhatsApp");
            }
            NotificationEvent::StatusChange { order, previous } => {
                info!(
                    phone,
                    order_id = %order.id,
                    from = %previous,
                    to = %order.status,
                    "Order status via WhatsApp"
                );
            }
            NotificationEvent::Message { subject, .. } => {
                info!(phone, subject = %subject, "WhatsApp message");
            }
        }
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> NotificationEvent {
        NotificationEvent::Message {
            subject: "subject".to_string(),
            body: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn skips_users_without_a_phone() {
        let user = User::new("Alice", "alice@example.com", "secret1");
        let outcome = WhatsAppChannel.deliver(&message(), &user).await.unwrap();
        assert_eq!(outcome, Delivery::Skipped);
    }

    #[tokio::test]
    async fn delivers_when_a_phone_is_on_file() {
        let mut user = User::new("Alice", "alice@example.com", "secret1");
        user.phone = Some("+1555123456".to_string());
        let outcome = WhatsAppChannel.deliver(&message(), &user).await.unwrap();
        assert_eq!(outcome, Delivery::Sent);
    }
}
