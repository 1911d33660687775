pub mod catalog;
pub mod commit;
pub mod pipeline;
pub mod reconcile;

pub use catalog::*;
pub use commit::*;
pub use pipeline::*;
pub use reconcile::*;
