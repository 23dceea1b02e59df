use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::clients::{OrderClient, ProductClient};
use crate::domain::{Order, OrderStatus, ProductId};
use crate::error::StoreError;

/// Sales totals for one product inside a report window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units: u64,
    pub revenue: Decimal,
}

/// Aggregation over the completed orders of a closed date range.
/// Pending and cancelled orders never contribute.
#[derive(Debug, Clone)]
pub struct SalesReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub orders_count: usize,
    pub total_revenue: Decimal,
    pub per_product: Vec<ProductSales>,
}

/// Point-in-time stock snapshot, counting and valuing every product on
/// record, retired ones included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryReport {
    pub products_on_file: usize,
    pub active_products: usize,
    pub out_of_stock: usize,
    pub inventory_value: Decimal,
}

#[derive(Clone)]
pub struct SalesReporting {
    orders: OrderClient,
    products: ProductClient,
}

impl SalesReporting {
    pub fn new(orders: OrderClient, products: ProductClient) -> Self {
        Self { orders, products }
    }

    /// Builds the report for `[from, to]`, both boundary instants
    /// included. Product names come from the catalog at report time; a
    /// product that no longer resolves is reported under its id.
    #[instrument(skip(self))]
    pub async fn report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesReport, StoreError> {
        info!("Processing report request");

        if from > to {
            return Err(StoreError::validation(
                "report range start must not be after its end",
            ));
        }

        let completed: Vec<Order> = self
            .orders
            .list_orders_by_date_range(from, to)
            .await?
            .into_iter()
            .filter(|order| order.status == OrderStatus::Completed)
            .collect();

        let mut tally: HashMap<ProductId, (u64, Decimal)> = HashMap::new();
        for order in &completed {
            for item in &order.items {
                let entry = tally.entry(item.product_id).or_insert((0, Decimal::ZERO));
                entry.0 += u64::from(item.quantity);
                entry.1 += item.subtotal();
            }
        }

        let names: HashMap<ProductId, String> = self
            .products
            .list_all_products()
            .await?
            .into_iter()
            .map(|product| (product.id, product.name))
            .collect();

        let mut per_product: Vec<ProductSales> = tally
            .into_iter()
            .map(|(product_id, (units, revenue))| ProductSales {
                product_id,
                name: names
                    .get(&product_id)
                    .cloned()
                    .unwrap_or_else(|| product_id.to_string()),
                units,
                revenue,
            })
            .collect();
        per_product.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));

        let total_revenue: Decimal = completed.iter().map(|order| order.total).sum();
        info!(orders = completed.len(), %total_revenue, "Report assembled");

        Ok(SalesReport {
            from,
            to,
            orders_count: completed.len(),
            total_revenue,
            per_product,
        })
    }

    /// The current UTC day in full, midnight through the last nanosecond.
    pub async fn report_today(&self) -> Result<SalesReport, StoreError> {
        let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::nanoseconds(1);
        self.report(start, end).await
    }

    /// The current month in full, the first day through the last.
    pub async fn report_this_month(&self) -> Result<SalesReport, StoreError> {
        let today = Utc::now().date_naive();
        let first = today.with_day(1).unwrap_or(today);
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = (first + Months::new(1)).and_time(NaiveTime::MIN).and_utc()
            - Duration::nanoseconds(1);
        self.report(start, end).await
    }

    /// Values the shelf at current prices.
    #[instrument(skip(self))]
    pub async fn inventory_report(&self) -> Result<InventoryReport, StoreError> {
        info!("Processing inventory_report request");

        let products = self.products.list_all_products().await?;
        let active_products = products.iter().filter(|p| p.active).count();
        let out_of_stock = products.iter().filter(|p| p.stock_available == 0).count();
        let inventory_value = products
            .iter()
            .map(|p| p.price * Decimal::from(p.stock_available))
            .sum();

        Ok(InventoryReport {
            products_on_file: products.len(),
            active_products,
            out_of_stock,
            inventory_value,
        })
    }
}
