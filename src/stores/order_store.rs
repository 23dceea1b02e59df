use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::clients::OrderClient;
use crate::domain::{Order, OrderId, OrderStatus, UserId};
use crate::error::StoreError;
use crate::messages::{OrderRequest, StoreResponse};

/// Store task owning the order records.
///
/// `Transition` applies the terminal-state guard and the status change in
/// one message, so two competing completions cannot both succeed.
pub struct OrderStore {
    receiver: mpsc::Receiver<OrderRequest>,
    orders: HashMap<OrderId, Order>,
}

impl OrderStore {
    pub fn new(buffer_size: usize) -> (Self, OrderClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            orders: HashMap::new(),
        };
        let client = OrderClient::new(sender);
        (store, client)
    }

    #[instrument(name = "order_store", skip(self))]
    pub async fn run(mut self) {
        info!("OrderStore starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                OrderRequest::Save { order, respond_to } => {
                    self.handle_save(order, respond_to);
                }
                OrderRequest::Get { id, respond_to } => {
                    self.handle_get(id, respond_to);
                }
                OrderRequest::ListByUser {
                    user_id,
                    respond_to,
                } => {
                    self.handle_list_by_user(user_id, respond_to);
                }
                OrderRequest::ListByStatus { status, respond_to } => {
                    self.handle_list_by_status(status, respond_to);
                }
                OrderRequest::ListByDateRange {
                    from,
                    to,
                    respond_to,
                } => {
                    self.handle_list_by_date_range(from, to, respond_to);
                }
                OrderRequest::ListAll { respond_to } => {
                    self.handle_list_all(respond_to);
                }
                OrderRequest::Exists { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.contains_key(&id)));
                }
                OrderRequest::Transition { id, to, respond_to } => {
                    self.handle_transition(id, to, respond_to);
                }
                OrderRequest::Shutdown => {
                    info!("OrderStore shutting down");
                    break;
                }
                #[cfg(test)]
                OrderRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.len()));
                }
            }
        }

        info!("OrderStore stopped");
    }

    #[instrument(fields(order_id = %order.id, total = %order.total), skip(self, order, respond_to))]
    fn handle_save(&mut self, order: Order, respond_to: StoreResponse<Order>) {
        debug!("Processing save request");

        self.orders.insert(order.id, order.clone());

        info!("Order saved");
        let _ = respond_to.send(Ok(order));
    }

    #[instrument(fields(order_id = %id), skip(self, respond_to))]
    fn handle_get(&self, id: OrderId, respond_to: StoreResponse<Option<Order>>) {
        debug!("Processing get request");

        let order = self.orders.get(&id).cloned();

        match &order {
            Some(order) => debug!(total = %order.total, "Order found"),
            None => debug!("Order not found"),
        }

        let _ = respond_to.send(Ok(order));
    }

    #[instrument(fields(user_id = %user_id), skip(self, respond_to))]
    fn handle_list_by_user(&self, user_id: UserId, respond_to: StoreResponse<Vec<Order>>) {
        debug!("Processing list_by_user request");

        let orders = self.snapshot(|o| o.user_id == user_id);
        info!(order_count = orders.len(), "Listed orders for user");

        let _ = respond_to.send(Ok(orders));
    }

    #[instrument(fields(status = %status), skip(self, respond_to))]
    fn handle_list_by_status(&self, status: OrderStatus, respond_to: StoreResponse<Vec<Order>>) {
        debug!("Processing list_by_status request");

        let orders = self.snapshot(|o| o.status == status);
        info!(order_count = orders.len(), "Listed orders by status");

        let _ = respond_to.send(Ok(orders));
    }

    /// Both boundary instants are part of the range.
    #[instrument(skip(self, respond_to))]
    fn handle_list_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        respond_to: StoreResponse<Vec<Order>>,
    ) {
        debug!("Processing list_by_date_range request");

        let orders = self.snapshot(|o| o.created_at >= from && o.created_at <= to);
        info!(order_count = orders.len(), "Listed orders in range");

        let _ = respond_to.send(Ok(orders));
    }

    #[instrument(skip(self, respond_to))]
    fn handle_list_all(&self, respond_to: StoreResponse<Vec<Order>>) {
        debug!("Processing list_all request");

        let orders = self.snapshot(|_| true);
        info!(order_count = orders.len(), "Listed orders");

        let _ = respond_to.send(Ok(orders));
    }

    #[instrument(fields(order_id = %id, to = %to), skip(self, respond_to))]
    fn handle_transition(
        &mut self,
        id: OrderId,
        to: OrderStatus,
        respond_to: StoreResponse<(OrderStatus, Order)>,
    ) {
        debug!("Processing transition request");

        let result = match self.orders.get_mut(&id) {
            Some(order) => {
                let previous = order.status;
                match order.transition(to) {
                    Ok(()) => {
                        info!(previous = %previous, "Order transitioned");
                        Ok((previous, order.clone()))
                    }
                    Err(terminal) => {
                        error!(status = %terminal, "Order already terminal");
                        Err(StoreError::conflict(format!(
                            "order already {}",
                            terminal.to_string().to_lowercase()
                        )))
                    }
                }
            }
            None => {
                error!("Order not found for transition");
                Err(StoreError::not_found("order", id))
            }
        };

        let _ = respond_to.send(result);
    }

    /// Value snapshot, newest first. The ordering is part of the contract.
    fn snapshot(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().filter(|o| keep(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}
