//! Business services layered over the store clients. Each service owns
//! nothing but client handles, so they clone freely and run anywhere.

pub mod accounts;
pub mod catalog;
pub mod orders;
pub mod reports;

pub use accounts::Accounts;
pub use catalog::Catalog;
pub use orders::{ItemRequest, OrderProcessing};
pub use reports::{InventoryReport, ProductSales, SalesReport, SalesReporting};
