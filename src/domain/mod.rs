pub mod ids;
pub mod order;
pub mod product;
pub mod user;

pub use ids::*;
pub use order::*;
pub use product::*;
pub use user::*;
