use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clients::{OrderClient, ProductClient, UserClient};
use crate::error::StoreError;
use crate::notify::{ChannelKind, CompositeNotifier};
use crate::service::{Accounts, Catalog, OrderProcessing, SalesReporting};
use crate::stores::{OrderStore, ProductStore, UserStore};

const CHANNEL_BUFFER: usize = 32;

/// The assembled application: one task per store, services wired over
/// their clients.
///
/// Responsible for starting the stores, wiring the services together and
/// handling shutdown.
pub struct StoreSystem {
    pub catalog: Catalog,
    pub accounts: Accounts,
    pub orders: OrderProcessing,
    pub reports: SalesReporting,
    products: ProductClient,
    users: UserClient,
    order_client: OrderClient,
    handles: Vec<JoinHandle<()>>,
}

impl StoreSystem {
    /// Full stack with every notification channel wired in.
    pub fn new() -> Self {
        Self::with_notifier(CompositeNotifier::with_kinds(&[
            ChannelKind::Email,
            ChannelKind::WhatsApp,
            ChannelKind::Telegram,
        ]))
    }

    pub fn with_notifier(notifier: CompositeNotifier) -> Self {
        let (product_store, products) = ProductStore::new(CHANNEL_BUFFER);
        let product_handle = tokio::spawn(product_store.run());

        let (user_store, users) = UserStore::new(CHANNEL_BUFFER);
        let user_handle = tokio::spawn(user_store.run());

        let (order_store, order_client) = OrderStore::new(CHANNEL_BUFFER);
        let order_handle = tokio::spawn(order_store.run());

        let catalog = Catalog::new(products.clone());
        let accounts = Accounts::new(users.clone(), order_client.clone());
        let orders = OrderProcessing::new(
            order_client.clone(),
            products.clone(),
            users.clone(),
            notifier,
        );
        let reports = SalesReporting::new(order_client.clone(), products.clone());

        info!("Store system started");
        Self {
            catalog,
            accounts,
            orders,
            reports,
            products,
            users,
            order_client,
            handles: vec![product_handle, user_handle, order_handle],
        }
    }

    /// Asks each store to stop, then waits for their tasks. The stores
    /// stop on the message even while service clones still hold senders.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        info!("Shutting down store system");

        self.products.shutdown().await?;
        self.users.shutdown().await?;
        self.order_client.shutdown().await?;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Store task failed");
                return Err(StoreError::Channel("store task failed".to_string()));
            }
        }

        info!("Store system shutdown complete");
        Ok(())
    }
}

impl Default for StoreSystem {
    fn default() -> Self {
        Self::new()
    }
}
