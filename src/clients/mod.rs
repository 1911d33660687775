pub mod classifier;
pub mod order_parser;

pub use classifier::*;
pub use order_parser::*;
