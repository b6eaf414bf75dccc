//! Data grid engine
//!
//! Column trees, width resolution, fixed-column layout, sorting and
//! filtering, tree rows with lazy loading, and cascading selection, with no
//! rendering attached. A front end feeds measurements and user intents into a
//! [`Grid`] and reads back rows, header cells and layout.

pub mod column;
pub mod config;
pub mod current;
pub mod error;
pub mod event;
pub mod expand;
pub mod layout;
pub mod model;
pub mod selection;
pub mod store;
pub mod tree;

mod grid;

pub use config::GridConfig;
pub use config::GridDocument;
pub use config::TreeProps;
pub use error::GridError;
pub use error::LoadError;
pub use error::Result;
pub use event::ExpandState;
pub use event::GridEvent;
pub use grid::*;
