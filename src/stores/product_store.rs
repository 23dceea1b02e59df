use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::clients::ProductClient;
use crate::domain::{Product, ProductId};
use crate::error::StoreError;
use crate::messages::{ProductRequest, StoreResponse};

/// Store task owning the product records.
///
/// Every request is handled to completion before the next one, so the
/// multi-product `Reserve` check-then-decrement is atomic: two competing
/// orders can never both pass the stock check.
pub struct ProductStore {
    receiver: mpsc::Receiver<ProductRequest>,
    products: HashMap<ProductId, Product>,
}

impl ProductStore {
    pub fn new(buffer_size: usize) -> (Self, ProductClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            products: HashMap::new(),
        };
        let client = ProductClient::new(sender);
        (store, client)
    }

    #[instrument(name = "product_store", skip(self))]
    pub async fn run(mut self) {
        info!("ProductStore starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ProductRequest::Save {
                    product,
                    respond_to,
                } => {
                    self.handle_save(product, respond_to);
                }
                ProductRequest::Get { id, respond_to } => {
                    self.handle_get(id, respond_to);
                }
                ProductRequest::ListActive { respond_to } => {
                    self.handle_list_active(respond_to);
                }
                ProductRequest::ListAll { respond_to } => {
                    self.handle_list_all(respond_to);
                }
                ProductRequest::SearchByName { name, respond_to } => {
                    self.handle_search_by_name(name, respond_to);
                }
                ProductRequest::Exists { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.products.contains_key(&id)));
                }
                ProductRequest::SetStock {
                    id,
                    quantity,
                    respond_to,
                } => {
                    self.handle_set_stock(id, quantity, respond_to);
                }
                ProductRequest::Edit {
                    id,
                    name,
                    description,
                    price,
                    respond_to,
                } => {
                    self.handle_edit(id, name, description, price, respond_to);
                }
                ProductRequest::Deactivate { id, respond_to } => {
                    self.handle_deactivate(id, respond_to);
                }
                ProductRequest::Reserve {
                    demands,
                    respond_to,
                } => {
                    self.handle_reserve(demands, respond_to);
                }
                ProductRequest::Restore {
                    refunds,
                    respond_to,
                } => {
                    self.handle_restore(refunds, respond_to);
                }
                ProductRequest::Shutdown => {
                    info!("ProductStore shutting down");
                    break;
                }
                #[cfg(test)]
                ProductRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.products.len()));
                }
            }
        }

        info!("ProductStore stopped");
    }

    #[instrument(fields(product_id = %product.id, product_name = %product.name), skip(self, product, respond_to))]
    fn handle_save(&mut self, product: Product, respond_to: StoreResponse<Product>) {
        debug!("Processing save request");

        self.products.insert(product.id, product.clone());

        info!("Product saved");
        let _ = respond_to.send(Ok(product));
    }

    #[instrument(fields(product_id = %id), skip(self, respond_to))]
    fn handle_get(&self, id: ProductId, respond_to: StoreResponse<Option<Product>>) {
        debug!("Processing get request");

        let product = self.products.get(&id).cloned();

        match &product {
            Some(product) => debug!(product_name = %product.name, "Product found"),
            None => debug!("Product not found"),
        }

        let _ = respond_to.send(Ok(product));
    }

    #[instrument(skip(self, respond_to))]
    fn handle_list_active(&self, respond_to: StoreResponse<Vec<Product>>) {
        debug!("Processing list_active request");

        let products = self.snapshot(|p| p.active);
        info!(product_count = products.len(), "Listed active products");

        let _ = respond_to.send(Ok(products));
    }

    #[instrument(skip(self, respond_to))]
    fn handle_list_all(&self, respond_to: StoreResponse<Vec<Product>>) {
        debug!("Processing list_all request");

        let products = self.snapshot(|_| true);
        info!(product_count = products.len(), "Listed products");

        let _ = respond_to.send(Ok(products));
    }

    /// Blank input matches nothing; the search covers active products only.
    #[instrument(skip(self, respond_to))]
    fn handle_search_by_name(&self, name: String, respond_to: StoreResponse<Vec<Product>>) {
        debug!("Processing search_by_name request");

        let needle = name.trim().to_lowercase();
        let products = if needle.is_empty() {
            Vec::new()
        } else {
            self.snapshot(|p| p.active && p.name.to_lowercase().contains(&needle))
        };

        info!(match_count = products.len(), "Search finished");
        let _ = respond_to.send(Ok(products));
    }

    #[instrument(fields(product_id = %id), skip(self, respond_to))]
    fn handle_set_stock(&mut self, id: ProductId, quantity: u32, respond_to: StoreResponse<Product>) {
        debug!("Processing set_stock request");

        let result = match self.products.get_mut(&id) {
            Some(product) => {
                product.set_stock(quantity);
                info!("Stock replaced");
                Ok(product.clone())
            }
            None => {
                error!("Product not found for stock update");
                Err(StoreError::not_found("product", id))
            }
        };

        let _ = respond_to.send(result);
    }

    /// Touches the descriptive fields only; stock stays as the running
    /// reservations left it.
    #[instrument(fields(product_id = %id), skip(self, name, description, respond_to))]
    fn handle_edit(
        &mut self,
        id: ProductId,
        name: String,
        description: String,
        price: Decimal,
        respond_to: StoreResponse<Product>,
    ) {
        debug!("Processing edit request");

        let result = match self.products.get_mut(&id) {
            Some(product) => {
                product.name = name;
                product.description = description;
                product.price = price;
                info!("Product updated");
                Ok(product.clone())
            }
            None => {
                error!("Product not found for edit");
                Err(StoreError::not_found("product", id))
            }
        };

        let _ = respond_to.send(result);
    }

    #[instrument(fields(product_id = %id), skip(self, respond_to))]
    fn handle_deactivate(&mut self, id: ProductId, respond_to: StoreResponse<()>) {
        debug!("Processing deactivate request");

        let result = match self.products.get_mut(&id) {
            Some(product) => {
                product.deactivate();
                info!("Product deactivated");
                Ok(())
            }
            None => {
                error!("Product not found for deactivation");
                Err(StoreError::not_found("product", id))
            }
        };

        let _ = respond_to.send(result);
    }

    /// Validates every demand before touching any stock, so a failed
    /// multi-product reservation decrements nothing. Demands naming the
    /// same product are summed before the check.
    #[instrument(fields(demand_count = demands.len()), skip(self, demands, respond_to))]
    fn handle_reserve(&mut self, demands: Vec<(ProductId, u32)>, respond_to: StoreResponse<()>) {
        debug!("Processing reserve request");

        let needed = Self::totals_per_product(&demands);

        for (&id, &quantity) in &needed {
            let Some(product) = self.products.get(&id) else {
                error!(product_id = %id, "Product not found for reservation");
                let _ = respond_to.send(Err(StoreError::not_found("product", id)));
                return;
            };
            if !product.has_stock(quantity) {
                error!(
                    product_id = %id,
                    requested = quantity,
                    available = product.stock_available,
                    "Insufficient stock"
                );
                let _ = respond_to.send(Err(StoreError::InsufficientStock {
                    product: id.to_string(),
                    requested: quantity,
                    available: product.stock_available,
                }));
                return;
            }
        }

        for (&id, &quantity) in &needed {
            if let Some(product) = self.products.get_mut(&id) {
                product.reserve(quantity);
            }
        }

        info!("Stock reserved");
        let _ = respond_to.send(Ok(()));
    }

    /// Puts reserved quantities back, all-or-nothing like `handle_reserve`.
    #[instrument(fields(refund_count = refunds.len()), skip(self, refunds, respond_to))]
    fn handle_restore(&mut self, refunds: Vec<(ProductId, u32)>, respond_to: StoreResponse<()>) {
        debug!("Processing restore request");

        let returned = Self::totals_per_product(&refunds);

        for &id in returned.keys() {
            if !self.products.contains_key(&id) {
                error!(product_id = %id, "Product not found for restore");
                let _ = respond_to.send(Err(StoreError::not_found("product", id)));
                return;
            }
        }

        for (&id, &quantity) in &returned {
            if let Some(product) = self.products.get_mut(&id) {
                product.restock(quantity);
            }
        }

        info!("Stock restored");
        let _ = respond_to.send(Ok(()));
    }

    /// Sums quantities per product id.
    fn totals_per_product(lines: &[(ProductId, u32)]) -> HashMap<ProductId, u32> {
        let mut totals: HashMap<ProductId, u32> = HashMap::new();
        for &(id, quantity) in lines {
            let entry = totals.entry(id).or_insert(0);
            *entry = entry.saturating_add(quantity);
        }
        totals
    }

    /// Value snapshot in registration order; v7 ids sort by creation time.
    fn snapshot(&self, keep: impl Fn(&Product) -> bool) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.values().filter(|p| keep(p)).cloned().collect();
        products.sort_by_key(|p| p.id);
        products
    }
}
