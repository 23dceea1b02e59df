use crate::domain::ids::{OrderId, UserId};

/// A registered user.
///
/// `order_history` holds order ids, newest last; the order store owns the
/// authoritative order records. The password is an opaque string compared
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub messaging_handle: Option<String>,
    pub active: bool,
    pub order_history: Vec<OrderId>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            password: password.into(),
            phone: None,
            messaging_handle: None,
            active: true,
            order_history: Vec::new(),
        }
    }

    /// WhatsApp delivery needs a phone number on file.
    pub fn can_receive_whatsapp(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Telegram delivery needs a messaging handle on file.
    pub fn can_receive_telegram(&self) -> bool {
        self.messaging_handle
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
    }

    pub fn record_order(&mut self, order_id: OrderId) {
        self.order_history.push(order_id);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
