//! Best-effort notification fan-out.
//!
//! Channels are independent: each decides whether the recipient is
//! reachable, and a failure in one is logged and contained, never surfaced
//! to the caller or allowed to stop the remaining channels.

pub mod email;
pub mod telegram;
pub mod whatsapp;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::{Order, OrderStatus, User};

pub use email::EmailChannel;
pub use telegram::TelegramChannel;
pub use whatsapp::WhatsAppChannel;

/// Events fanned out to the channels.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    NewOrder {
        order: Order,
    },
    StatusChange {
        order: Order,
        previous: OrderStatus,
    },
    Message {
        subject: String,
        body: String,
    },
}

/// Outcome of a delivery attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The recipient cannot receive on this channel. Not an error.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("unknown channel kind: {0}")]
    UnknownKind(String),
    #[error("delivery via {channel} failed: {reason}")]
    Delivery { channel: ChannelKind, reason: String },
}

/// The channel kinds the factory knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Email,
    WhatsApp,
    Telegram,
}

impl ChannelKind {
    pub fn build(self) -> Arc<dyn NotificationChannel> {
        match self {
            Self::Email => Arc::new(EmailChannel),
            Self::WhatsApp => Arc::new(WhatsAppChannel),
            Self::Telegram => Arc::new(TelegramChannel),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::WhatsApp => write!(f, "whatsapp"),
            Self::Telegram => write!(f, "telegram"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" => Ok(Self::WhatsApp),
            "telegram" => Ok(Self::Telegram),
            other => Err(NotifyError::UnknownKind(other.to_string())),
        }
    }
}

/// One delivery channel. Implementations decide recipient eligibility on
/// their own; an ineligible recipient is a skip, not a failure.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn deliver(
        &self,
        event: &NotificationEvent,
        recipient: &User,
    ) -> Result<Delivery, NotifyError>;
}

/// Fans each event to every registered channel, in registration order.
#[derive(Clone)]
pub struct CompositeNotifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl CompositeNotifier {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn with_kinds(kinds: &[ChannelKind]) -> Self {
        Self::new(kinds.iter().map(|kind| kind.build()).collect())
    }

    #[instrument(fields(channel_count = self.channels.len(), user_id = %recipient.id), skip(self, event, recipient))]
    pub async fn notify(&self, event: &NotificationEvent, recipient: &User) {
        for channel in &self.channels {
            match channel.deliver(event, recipient).await {
                Ok(Delivery::Sent) => {
                    debug!(channel = %channel.kind(), "Notification delivered");
                }
                Ok(Delivery::Skipped) => {
                    debug!(channel = %channel.kind(), "Recipient not reachable on channel");
                }
                Err(e) => {
                    warn!(channel = %channel.kind(), error = %e, "Notification delivery failed");
                }
            }
        }
    }
}
