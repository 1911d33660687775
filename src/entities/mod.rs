pub mod manufacturer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod retailer;

pub mod prelude;
