//! Error types

mod grid;
mod load;

pub use grid::*;
pub use load::*;
