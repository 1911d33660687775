pub use super::manufacturer::Entity as Manufacturer;
pub use super::order::Entity as Order;
pub use super::order_item::Entity as OrderItem;
pub use super::product::Entity as Product;
pub use super::retailer::Entity as Retailer;
