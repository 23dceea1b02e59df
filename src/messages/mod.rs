use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::domain::{Order, OrderId, OrderStatus, Product, ProductId, User, UserId};
use crate::error::StoreError;

/// Generic type aliases for store communication
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type StoreResponse<T> = oneshot::Sender<StoreResult<T>>;

/// Typed message enums for the store tasks. Each variant carries its
/// parameters and a oneshot channel for the response.

#[derive(Debug)]
pub enum ProductRequest {
    /// Upsert keyed by the product's id; echoes the stored copy back.
    Save {
        product: Product,
        respond_to: StoreResponse<Product>,
    },
    Get {
        id: ProductId,
        respond_to: StoreResponse<Option<Product>>,
    },
    ListActive {
        respond_to: StoreResponse<Vec<Product>>,
    },
    ListAll {
        respond_to: StoreResponse<Vec<Product>>,
    },
    /// Case-insensitive substring match over active products.
    SearchByName {
        name: String,
        respond_to: StoreResponse<Vec<Product>>,
    },
    Exists {
        id: ProductId,
        respond_to: StoreResponse<bool>,
    },
    /// Absolute stock replacement.
    SetStock {
        id: ProductId,
        quantity: u32,
        respond_to: StoreResponse<Product>,
    },
    /// In-place edit of the descriptive fields; stock is untouched, so a
    /// concurrent reservation cannot be clobbered.
    Edit {
        id: ProductId,
        name: String,
        description: String,
        price: Decimal,
        respond_to: StoreResponse<Product>,
    },
    /// Soft delete; the record stays resolvable by id.
    Deactivate {
        id: ProductId,
        respond_to: StoreResponse<()>,
    },
    /// All-or-nothing multi-product reservation: every demand is checked
    /// before any stock is decremented.
    Reserve {
        demands: Vec<(ProductId, u32)>,
        respond_to: StoreResponse<()>,
    },
    /// Adds previously reserved quantities back.
    Restore {
        refunds: Vec<(ProductId, u32)>,
        respond_to: StoreResponse<()>,
    },
    Shutdown,
    #[cfg(test)]
    Count {
        respond_to: StoreResponse<usize>,
    },
}

#[derive(Debug)]
pub enum UserRequest {
    /// Upsert keyed by the user's id; keeps the email index current.
    Save {
        user: User,
        respond_to: StoreResponse<User>,
    },
    /// Insert guarded by email uniqueness (case-insensitive).
    Register {
        user: User,
        respond_to: StoreResponse<User>,
    },
    Get {
        id: UserId,
        respond_to: StoreResponse<Option<User>>,
    },
    GetByEmail {
        email: String,
        respond_to: StoreResponse<Option<User>>,
    },
    ListActive {
        respond_to: StoreResponse<Vec<User>>,
    },
    ListAll {
        respond_to: StoreResponse<Vec<User>>,
    },
    ExistsByEmail {
        email: String,
        respond_to: StoreResponse<bool>,
    },
    /// Exact-match credential check; a miss of any kind is `None`.
    Authenticate {
        email: String,
        password: String,
        respond_to: StoreResponse<Option<User>>,
    },
    AppendHistory {
        user_id: UserId,
        order_id: OrderId,
        respond_to: StoreResponse<()>,
    },
    /// In-place profile edit: the name applies only when non-blank, while
    /// phone and messaging handle are replaced as given (None clears).
    UpdateProfile {
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
        messaging_handle: Option<String>,
        respond_to: StoreResponse<User>,
    },
    Deactivate {
        id: UserId,
        respond_to: StoreResponse<()>,
    },
    Shutdown,
    #[cfg(test)]
    Count {
        respond_to: StoreResponse<usize>,
    },
}

#[derive(Debug)]
pub enum OrderRequest {
    Save {
        order: Order,
        respond_to: StoreResponse<Order>,
    },
    Get {
        id: OrderId,
        respond_to: StoreResponse<Option<Order>>,
    },
    ListByUser {
        user_id: UserId,
        respond_to: StoreResponse<Vec<Order>>,
    },
    ListByStatus {
        status: OrderStatus,
        respond_to: StoreResponse<Vec<Order>>,
    },
    /// Inclusive on both boundary instants.
    ListByDateRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        respond_to: StoreResponse<Vec<Order>>,
    },
    ListAll {
        respond_to: StoreResponse<Vec<Order>>,
    },
    Exists {
        id: OrderId,
        respond_to: StoreResponse<bool>,
    },
    /// Guarded status change; answers with the prior status and the updated
    /// order, or a conflict if the order already reached a terminal state.
    Transition {
        id: OrderId,
        to: OrderStatus,
        respond_to: StoreResponse<(OrderStatus, Order)>,
    },
    Shutdown,
    #[cfg(test)]
    Count {
        respond_to: StoreResponse<usize>,
    },
}
