use rust_decimal::Decimal;

use crate::domain::ids::ProductId;

/// A catalog product together with its available stock.
///
/// Products are never removed from the store; "deleting" one marks it
/// inactive so existing orders can still resolve it.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_available: u32,
    pub active: bool,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        stock_available: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: description.into(),
            price,
            stock_available,
            active: true,
        }
    }

    /// True when at least `quantity` units are on hand.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock_available >= quantity
    }

    /// Takes `quantity` units out of stock. Returns false and leaves the
    /// stock untouched when fewer units are available.
    pub fn reserve(&mut self, quantity: u32) -> bool {
        if quantity > self.stock_available {
            return false;
        }
        self.stock_available -= quantity;
        true
    }

    /// Puts `quantity` units back into stock.
    pub fn restock(&mut self, quantity: u32) {
        self.stock_available = self.stock_available.saturating_add(quantity);
    }

    /// Replaces the stock level with an absolute count.
    pub fn set_stock(&mut self, quantity: u32) {
        self.stock_available = quantity;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
