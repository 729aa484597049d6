pub mod facts;
pub mod fixtures;

pub use facts::*;
pub use fixtures::*;
