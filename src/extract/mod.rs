pub mod envelope;
pub mod quantity_lines;

pub use envelope::*;
pub use quantity_lines::*;
