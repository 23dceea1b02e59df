use rust_decimal::Decimal;
use tracing::{error, info, instrument};

use crate::clients::ProductClient;
use crate::domain::{Product, ProductId};
use crate::error::StoreError;

/// Product management on top of the product store: registration, edits,
/// stock control and soft removal. Removal never drops the record, so
/// orders that reference the product keep resolving.
#[derive(Clone)]
pub struct Catalog {
    products: ProductClient,
}

impl Catalog {
    pub fn new(products: ProductClient) -> Self {
        Self { products }
    }

    #[instrument(fields(product_name = %name), skip(self, name, description))]
    pub async fn register_product(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
        initial_stock: u32,
    ) -> Result<Product, StoreError> {
        info!("Processing register_product request");
        validate(name, price)?;

        let product = self
            .products
            .save_product(Product::new(name, description, price, initial_stock))
            .await?;
        info!(product_id = %product.id, "Product registered");
        Ok(product)
    }

    /// Rewrites the descriptive fields in place. Stock is owned by the
    /// reservation flow and is never touched here.
    #[instrument(fields(product_id = %id), skip(self, name, description))]
    pub async fn update_product(
        &self,
        id: ProductId,
        name: &str,
        description: &str,
        price: Decimal,
    ) -> Result<Product, StoreError> {
        info!("Processing update_product request");
        validate(name, price)?;

        self.products
            .edit_product(id, name.to_string(), description.to_string(), price)
            .await
    }

    #[instrument(fields(product_id = %id), skip(self))]
    pub async fn set_stock(&self, id: ProductId, quantity: u32) -> Result<Product, StoreError> {
        info!("Processing set_stock request");
        self.products.set_stock(id, quantity).await
    }

    /// Soft delete: the product leaves the catalog views but stays
    /// resolvable by id.
    #[instrument(fields(product_id = %id), skip(self))]
    pub async fn remove_product(&self, id: ProductId) -> Result<(), StoreError> {
        info!("Processing remove_product request");
        self.products.deactivate_product(id).await
    }

    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.products.get_product(id).await
    }

    /// Active products only, in registration order.
    pub async fn catalog(&self) -> Result<Vec<Product>, StoreError> {
        self.products.list_active_products().await
    }

    pub async fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        self.products.list_all_products().await
    }

    /// Case-insensitive substring search over active products.
    pub async fn search(&self, name: &str) -> Result<Vec<Product>, StoreError> {
        self.products.search_by_name(name.to_string()).await
    }
}

fn validate(name: &str, price: Decimal) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        error!("Product name is blank");
        return Err(StoreError::validation("product name must not be blank"));
    }
    if price <= Decimal::ZERO {
        error!(%price, "Product price is not positive");
        return Err(StoreError::validation("product price must be positive"));
    }
    Ok(())
}
