use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::User;
use crate::notify::{ChannelKind, Delivery, NotificationChannel, NotificationEvent, NotifyError};

/// Email stub. Every user registers with an address, so nothing is skipped;
/// the would-be message is written to the log instead of a mail gateway.
pub struct EmailChannel;

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    #[instrument(name = "email_channel", fields(recipient = %user.email), skip(self, event, user))]
    async fn deliver(
        &self,
        event: &NotificationEvent,
        user: &User,
    ) -> Result<Delivery, NotifyError> {
        match event {
            NotificationEvent::NewOrder { order } => {
                info!(order_id = %order.id, total = %order.total, "Order confirmation email");
            }
            NotificationEvent::StatusChange { order, previous } => {
                info!(
                    order_id = %order.id,
                    from = %previous,
                    to = %order.status,
                    "Order status email"
                );
            }
            NotificationEvent::Message { subject, .. } => {
                info!(subject = %subject, "Email message");
            }
        }
        Ok(Delivery::Sent)
    }
}
