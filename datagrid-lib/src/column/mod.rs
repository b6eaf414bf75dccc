//! Column declarations, registration and header geometry

mod header;
mod item;
mod registry;

pub use header::*;
pub use item::*;
pub use registry::*;
