//! Store tasks owning the in-memory records, one per entity family.

pub mod order_store;
pub mod product_store;
pub mod user_store;

pub use order_store::OrderStore;
pub use product_store::ProductStore;
pub use user_store::UserStore;
