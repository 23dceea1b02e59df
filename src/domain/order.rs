use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::ids::{OrderId, OrderItemId, ProductId, UserId};
use crate::domain::product::Product;

/// Lifecycle of an order. Pending orders move to exactly one of the two
/// terminal states and never leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One line of an order. The unit price is captured from the product when
/// the line is built; later catalog edits never reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            id: OrderItemId::new(),
            product_id: product.id,
            quantity,
            unit_price: product.price,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A purchase order. Items are attached at construction and the total is
/// derived from them; the user is referenced by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total: Decimal,
}

impl Order {
    pub fn new(user_id: UserId, items: Vec<OrderItem>) -> Self {
        let now = Utc::now();
        let total = items.iter().map(OrderItem::subtotal).sum();
        Self {
            id: OrderId::new(),
            user_id,
            items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            total,
        }
    }

    /// Moves a pending order to `to` and bumps `updated_at`. A terminal
    /// order is left untouched; its current status comes back as the error.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), OrderStatus> {
        if self.status.is_terminal() {
            return Err(self.status);
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
