//! Row records, row identity and dynamic value helpers

mod row;
mod value;

pub use row::*;
pub use value::*;
