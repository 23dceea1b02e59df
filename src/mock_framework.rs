//! # Mock Framework
//!
//! Utilities for testing clients and services in isolation.
//!
//! Use the `mock_*_client` constructors to get a client and a receiver.
//! Then use helpers like [`expect_user_get`] or [`expect_reserve`] to assert behavior.

use tokio::sync::mpsc;

use crate::clients::{OrderClient, ProductClient, UserClient};
use crate::domain::{Order, OrderId, OrderStatus, Product, ProductId, User, UserId};
use crate::messages::{OrderRequest, ProductRequest, StoreResponse, UserRequest};

/// Creates a mock product client and a receiver for asserting requests.
///
/// # Testing Strategy
/// In unit/integration tests, we don't want to spin up a full store task if we are just
/// testing the service logic (e.g., `OrderProcessing`).
///
/// Instead, we create a "Mock Client". This client sends messages to a channel we control
/// (`receiver`). We can then inspect the messages arriving on that channel and assert they
/// are correct. This allows us to simulate the store's behavior (success, failure, delays)
/// deterministically.
pub fn mock_product_client(
    buffer_size: usize,
) -> (ProductClient, mpsc::Receiver<ProductRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ProductClient::new(sender), receiver)
}

pub fn mock_user_client(buffer_size: usize) -> (UserClient, mpsc::Receiver<UserRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (UserClient::new(sender), receiver)
}

pub fn mock_order_client(buffer_size: usize) -> (OrderClient, mpsc::Receiver<OrderRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (OrderClient::new(sender), receiver)
}

/// Helper to verify that the next message is a user Get request
pub async fn expect_user_get(
    receiver: &mut mpsc::Receiver<UserRequest>,
) -> Option<(UserId, StoreResponse<Option<User>>)> {
    match receiver.recv().await {
        Some(UserRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an AppendHistory request
pub async fn expect_append_history(
    receiver: &mut mpsc::Receiver<UserRequest>,
) -> Option<(UserId, OrderId, StoreResponse<()>)> {
    match receiver.recv().await {
        Some(UserRequest::AppendHistory {
            user_id,
            order_id,
            respond_to,
        }) => Some((user_id, order_id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a product Get request
pub async fn expect_product_get(
    receiver: &mut mpsc::Receiver<ProductRequest>,
) -> Option<(ProductId, StoreResponse<Option<Product>>)> {
    match receiver.recv().await {
        Some(ProductRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a stock Reserve request
pub async fn expect_reserve(
    receiver: &mut mpsc::Receiver<ProductRequest>,
) -> Option<(Vec<(ProductId, u32)>, StoreResponse<()>)> {
    match receiver.recv().await {
        Some(ProductRequest::Reserve {
            demands,
            respond_to,
        }) => Some((demands, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a stock Restore request
pub async fn expect_restore(
    receiver: &mut mpsc::Receiver<ProductRequest>,
) -> Option<(Vec<(ProductId, u32)>, StoreResponse<()>)> {
    match receiver.recv().await {
        Some(ProductRequest::Restore {
            refunds,
            respond_to,
        }) => Some((refunds, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an order Save request
pub async fn expect_order_save(
    receiver: &mut mpsc::Receiver<OrderRequest>,
) -> Option<(Order, StoreResponse<Order>)> {
    match receiver.recv().await {
        Some(OrderRequest::Save { order, respond_to }) => Some((order, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a status Transition request
pub async fn expect_transition(
    receiver: &mut mpsc::Receiver<OrderRequest>,
) -> Option<(OrderId, OrderStatus, StoreResponse<(OrderStatus, Order)>)> {
    match receiver.recv().await {
        Some(OrderRequest::Transition { id, to, respond_to }) => Some((id, to, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = mock_product_client(10);

        let widget = Product::new("Widget", "A widget", dec!(10.00), 5);
        let widget_id = widget.id;

        let get_task = tokio::spawn(async move { client.get_product(widget_id).await });

        let (requested_id, responder) = expect_product_get(&mut receiver)
            .await
            .expect("Expected Get request");
        assert_eq!(requested_id, widget_id);
        responder.send(Ok(Some(widget.clone()))).unwrap();

        let result = get_task.await.unwrap();
        assert_eq!(result, Ok(Some(widget)));
    }
}
