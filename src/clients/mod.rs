use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{Order, OrderId, OrderStatus, Product, ProductId, User, UserId};
use crate::error::StoreError;
use crate::messages::{OrderRequest, ProductRequest, UserRequest};

/// Generates a client method that sends one request variant and waits for
/// the oneshot answer, with automatic tracing and channel error mapping.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident) => {
        #[allow(dead_code)]
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, StoreError> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender
                    .send($request::$variant {
                        $($param,)*
                        respond_to,
                    })
                    .await
                    .map_err(|_| StoreError::Channel("store closed".to_string()))?;

                response
                    .await
                    .map_err(|_| StoreError::Channel("store dropped".to_string()))?
            }
        }
    };
}

// =============================================================================
// PRODUCT CLIENT
// =============================================================================

/// Handle for talking to the product store. Cheap to clone; every clone
/// shares the same store task.
#[derive(Clone)]
pub struct ProductClient {
    sender: mpsc::Sender<ProductRequest>,
}

impl ProductClient {
    pub fn new(sender: mpsc::Sender<ProductRequest>) -> Self {
        Self { sender }
    }

    /// Manual method for the no-response shutdown request.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(ProductRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;
        Ok(())
    }
}

client_method!(ProductClient => fn save_product(product: Product) -> Product as ProductRequest::Save);
client_method!(ProductClient => fn get_product(id: ProductId) -> Option<Product> as ProductRequest::Get);
client_method!(ProductClient => fn list_active_products() -> Vec<Product> as ProductRequest::ListActive);
client_method!(ProductClient => fn list_all_products() -> Vec<Product> as ProductRequest::ListAll);
client_method!(ProductClient => fn search_by_name(name: String) -> Vec<Product> as ProductRequest::SearchByName);
client_method!(ProductClient => fn product_exists(id: ProductId) -> bool as ProductRequest::Exists);
client_method!(ProductClient => fn set_stock(id: ProductId, quantity: u32) -> Product as ProductRequest::SetStock);
client_method!(ProductClient => fn edit_product(id: ProductId, name: String, description: String, price: Decimal) -> Product as ProductRequest::Edit);
client_method!(ProductClient => fn deactivate_product(id: ProductId) -> () as ProductRequest::Deactivate);
client_method!(ProductClient => fn reserve_stock(demands: Vec<(ProductId, u32)>) -> () as ProductRequest::Reserve);
client_method!(ProductClient => fn restore_stock(refunds: Vec<(ProductId, u32)>) -> () as ProductRequest::Restore);

// Test-only method for internal state inspection
#[cfg(test)]
client_method!(ProductClient => fn product_count() -> usize as ProductRequest::Count);

// =============================================================================
// USER CLIENT
// =============================================================================

#[derive(Clone)]
pub struct UserClient {
    sender: mpsc::Sender<UserRequest>,
}

impl UserClient {
    pub fn new(sender: mpsc::Sender<UserRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(UserRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;
        Ok(())
    }

    /// Manual method so the span records safe fields only, never the
    /// password carried inside the user record.
    #[instrument(fields(user_id = %user.id, user_email = %user.email), skip(self, user))]
    #[allow(dead_code)]
    pub async fn save_user(&self, user: User) -> Result<User, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(UserRequest::Save { user, respond_to })
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;

        response
            .await
            .map_err(|_| StoreError::Channel("store dropped".to_string()))?
    }

    #[instrument(fields(user_email = %user.email), skip(self, user))]
    pub async fn register_user(&self, user: User) -> Result<User, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(UserRequest::Register { user, respond_to })
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;

        response
            .await
            .map_err(|_| StoreError::Channel("store dropped".to_string()))?
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: String,
        password: String,
    ) -> Result<Option<User>, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(UserRequest::Authenticate {
                email,
                password,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;

        response
            .await
            .map_err(|_| StoreError::Channel("store dropped".to_string()))?
    }
}

client_method!(UserClient => fn get_user(id: UserId) -> Option<User> as UserRequest::Get);
client_method!(UserClient => fn get_user_by_email(email: String) -> Option<User> as UserRequest::GetByEmail);
client_method!(UserClient => fn list_active_users() -> Vec<User> as UserRequest::ListActive);
client_method!(UserClient => fn list_all_users() -> Vec<User> as UserRequest::ListAll);
client_method!(UserClient => fn user_exists_by_email(email: String) -> bool as UserRequest::ExistsByEmail);
client_method!(UserClient => fn append_history(user_id: UserId, order_id: OrderId) -> () as UserRequest::AppendHistory);
client_method!(UserClient => fn update_profile(id: UserId, name: Option<String>, phone: Option<String>, messaging_handle: Option<String>) -> User as UserRequest::UpdateProfile);
client_method!(UserClient => fn deactivate_user(id: UserId) -> () as UserRequest::Deactivate);

#[cfg(test)]
client_method!(UserClient => fn user_count() -> usize as UserRequest::Count);

// =============================================================================
// ORDER CLIENT
// =============================================================================

#[derive(Clone)]
pub struct OrderClient {
    sender: mpsc::Sender<OrderRequest>,
}

impl OrderClient {
    pub fn new(sender: mpsc::Sender<OrderRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(OrderRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Channel("store closed".to_string()))?;
        Ok(())
    }
}

client_method!(OrderClient => fn save_order(order: Order) -> Order as OrderRequest::Save);
client_method!(OrderClient => fn get_order(id: OrderId) -> Option<Order> as OrderRequest::Get);
client_method!(OrderClient => fn list_orders_by_user(user_id: UserId) -> Vec<Order> as OrderRequest::ListByUser);
client_method!(OrderClient => fn list_orders_by_status(status: OrderStatus) -> Vec<Order> as OrderRequest::ListByStatus);
client_method!(OrderClient => fn list_orders_by_date_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Order> as OrderRequest::ListByDateRange);
client_method!(OrderClient => fn list_all_orders() -> Vec<Order> as OrderRequest::ListAll);
client_method!(OrderClient => fn order_exists(id: OrderId) -> bool as OrderRequest::Exists);
client_method!(OrderClient => fn transition_order(id: OrderId, to: OrderStatus) -> (OrderStatus, Order) as OrderRequest::Transition);

#[cfg(test)]
client_method!(OrderClient => fn order_count() -> usize as OrderRequest::Count);
