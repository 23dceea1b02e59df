use tracing::{error, info, instrument, warn};

use crate::clients::{OrderClient, ProductClient, UserClient};
use crate::domain::{Order, OrderId, OrderItem, OrderStatus, ProductId, User, UserId};
use crate::error::StoreError;
use crate::notify::{CompositeNotifier, NotificationEvent};

/// One requested line of a new order.
#[derive(Debug, Clone, Copy)]
pub struct ItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Drives the order state machine across the stores.
///
/// Holds client handles only; the stores own the data. Notifications go
/// out on their own task after the stores are updated, so they can never
/// fail or delay the operation itself.
#[derive(Clone)]
pub struct OrderProcessing {
    orders: OrderClient,
    products: ProductClient,
    users: UserClient,
    notifier: CompositeNotifier,
}

impl OrderProcessing {
    pub fn new(
        orders: OrderClient,
        products: ProductClient,
        users: UserClient,
        notifier: CompositeNotifier,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            notifier,
        }
    }

    /// Creates an order: resolve the user, snapshot unit prices, reserve
    /// all stock in one step, persist, record history, notify.
    ///
    /// The reservation is all-or-nothing; when any line lacks stock the
    /// whole call fails and no product is touched.
    #[instrument(fields(user_id = %user_id, item_count = items.len()), skip(self, items))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: Vec<ItemRequest>,
    ) -> Result<Order, StoreError> {
        info!("Processing create_order request");

        if items.is_empty() {
            error!("Order has no items");
            return Err(StoreError::validation("order must contain at least one item"));
        }
        if let Some(bad) = items.iter().find(|item| item.quantity == 0) {
            error!(product_id = %bad.product_id, "Zero quantity requested");
            return Err(StoreError::validation("item quantity must be positive"));
        }

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        // Unit prices are snapshotted from the products as they are now;
        // later catalog edits do not reach the order.
        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = self
                .products
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| StoreError::not_found("product", item.product_id))?;
            lines.push(OrderItem::new(&product, item.quantity));
        }

        let demands: Vec<(ProductId, u32)> = items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.products.reserve_stock(demands.clone()).await?;

        // An unsaved order cannot anchor its reservation, so the units go
        // back before the error surfaces. A saved order owns its units until
        // cancelled, so the history append below must not restore on failure.
        let order = match self.orders.save_order(Order::new(user_id, lines)).await {
            Ok(order) => order,
            Err(e) => {
                if let Err(restore_err) = self.products.restore_stock(demands).await {
                    warn!(error = %restore_err, "Reserved stock could not be returned");
                }
                return Err(e);
            }
        };
        self.users.append_history(user_id, order.id).await?;

        info!(order_id = %order.id, total = %order.total, "Order created");
        self.dispatch(
            NotificationEvent::NewOrder {
                order: order.clone(),
            },
            user,
        );
        Ok(order)
    }

    /// Stock stays committed; completion only moves the status.
    #[instrument(fields(order_id = %order_id), skip(self))]
    pub async fn complete_order(&self, order_id: OrderId) -> Result<Order, StoreError> {
        info!("Processing complete_order request");

        let (previous, order) = self
            .orders
            .transition_order(order_id, OrderStatus::Completed)
            .await?;
        info!("Order completed");

        self.notify_status_change(order.clone(), previous).await;
        Ok(order)
    }

    /// Cancelling gives every reserved unit back to its product.
    #[instrument(fields(order_id = %order_id), skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, StoreError> {
        info!("Processing cancel_order request");

        let (previous, order) = self
            .orders
            .transition_order(order_id, OrderStatus::Cancelled)
            .await?;

        let refunds: Vec<(ProductId, u32)> = order
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.products.restore_stock(refunds).await?;
        info!("Order cancelled, stock restored");

        self.notify_status_change(order.clone(), previous).await;
        Ok(order)
    }

    pub async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.orders.get_order(id).await
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        self.orders.list_orders_by_user(user_id).await
    }

    pub async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        self.orders.list_orders_by_status(status).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.orders.list_all_orders().await
    }

    async fn notify_status_change(&self, order: Order, previous: OrderStatus) {
        match self.users.get_user(order.user_id).await {
            Ok(Some(user)) => {
                self.dispatch(NotificationEvent::StatusChange { order, previous }, user);
            }
            Ok(None) => {
                warn!(user_id = %order.user_id, "Order user missing, notification dropped");
            }
            Err(e) => {
                warn!(error = %e, "User lookup for notification failed");
            }
        }
    }

    /// Fan-out runs on its own task, after the stores are updated.
    fn dispatch(&self, event: NotificationEvent, recipient: User) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.notify(&event, &recipient).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use crate::stores::{OrderStore, ProductStore, UserStore};
    use rust_decimal_macros::dec;

    fn system() -> (OrderProcessing, ProductClient, UserClient) {
        let (product_store, products) = ProductStore::new(16);
        tokio::spawn(product_store.run());
        let (user_store, users) = UserStore::new(16);
        tokio::spawn(user_store.run());
        let (order_store, orders) = OrderStore::new(16);
        tokio::spawn(order_store.run());

        let service = OrderProcessing::new(
            orders,
            products.clone(),
            users.clone(),
            CompositeNotifier::new(Vec::new()),
        );
        (service, products, users)
    }

    async fn stock_of(products: &ProductClient, id: ProductId) -> u32 {
        products
            .get_product(id)
            .await
            .unwrap()
            .unwrap()
            .stock_available
    }

    #[tokio::test]
    async fn create_rejects_an_empty_item_list() {
        let (service, _, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let denied = service.create_order(alice.id, Vec::new()).await.unwrap_err();
        assert!(matches!(denied, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_zero_quantities() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();

        let denied = service
            .create_order(alice.id, vec![ItemRequest::new(widget.id, 0)])
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::Validation(_)));
        assert_eq!(stock_of(&products, widget.id).await, 5);
    }

    #[tokio::test]
    async fn create_requires_a_known_user() {
        let (service, products, _) = system();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();

        let denied = service
            .create_order(UserId::new(), vec![ItemRequest::new(widget.id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::NotFound { entity: "user", .. }));
        assert_eq!(stock_of(&products, widget.id).await, 5);
    }

    #[tokio::test]
    async fn one_short_line_fails_the_whole_order_without_decrements() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();
        let gadget = products
            .save_product(Product::new("Gadget", "A gadget", dec!(4.00), 1))
            .await
            .unwrap();

        let denied = service
            .create_order(
                alice.id,
                vec![ItemRequest::new(widget.id, 2), ItemRequest::new(gadget.id, 3)],
            )
            .await
            .unwrap_err();
        assert!(matches!(denied, StoreError::InsufficientStock { .. }));

        assert_eq!(stock_of(&products, widget.id).await, 5);
        assert_eq!(stock_of(&products, gadget.id).await, 1);
        assert!(service.all_orders().await.unwrap().is_empty());

        let history = users.get_user(alice.id).await.unwrap().unwrap().order_history;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn create_decrements_snapshots_and_records_history() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let mut widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();

        let order = service
            .create_order(alice.id, vec![ItemRequest::new(widget.id, 3)])
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, dec!(30.00));
        assert_eq!(stock_of(&products, widget.id).await, 2);

        let history = users.get_user(alice.id).await.unwrap().unwrap().order_history;
        assert_eq!(history, vec![order.id]);

        // A later price change leaves the persisted order untouched.
        widget.price = dec!(99.00);
        products.save_product(widget).await.unwrap();
        let stored = service.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total, dec!(30.00));
        assert_eq!(stored.items[0].unit_price, dec!(10.00));
    }

    #[tokio::test]
    async fn cancel_restores_every_line_exactly() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();
        let gadget = products
            .save_product(Product::new("Gadget", "A gadget", dec!(4.00), 7))
            .await
            .unwrap();

        let order = service
            .create_order(
                alice.id,
                vec![ItemRequest::new(widget.id, 2), ItemRequest::new(gadget.id, 5)],
            )
            .await
            .unwrap();
        assert_eq!(stock_of(&products, widget.id).await, 3);
        assert_eq!(stock_of(&products, gadget.id).await, 2);

        let cancelled = service.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&products, widget.id).await, 5);
        assert_eq!(stock_of(&products, gadget.id).await, 7);
    }

    #[tokio::test]
    async fn terminal_orders_reject_a_second_transition() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();

        let order = service
            .create_order(alice.id, vec![ItemRequest::new(widget.id, 1)])
            .await
            .unwrap();
        service.complete_order(order.id).await.unwrap();

        let again = service.complete_order(order.id).await.unwrap_err();
        assert_eq!(again, StoreError::conflict("order already completed"));

        let cancel = service.cancel_order(order.id).await.unwrap_err();
        assert!(matches!(cancel, StoreError::Conflict(_)));

        // The failed cancel restored nothing.
        assert_eq!(stock_of(&products, widget.id).await, 4);
    }

    #[tokio::test]
    async fn completion_leaves_stock_committed() {
        let (service, products, users) = system();
        let alice = users
            .register_user(User::new("Alice", "alice@example.com", "secret1"))
            .await
            .unwrap();
        let widget = products
            .save_product(Product::new("Widget", "A widget", dec!(10.00), 5))
            .await
            .unwrap();

        let order = service
            .create_order(alice.id, vec![ItemRequest::new(widget.id, 3)])
            .await
            .unwrap();
        let completed = service.complete_order(order.id).await.unwrap();

        assert_eq!(completed.status, OrderStatus::Completed);
        assert_eq!(stock_of(&products, widget.id).await, 2);
    }
}
