mod container;
mod probe;

pub use container::*;
pub use probe::*;
