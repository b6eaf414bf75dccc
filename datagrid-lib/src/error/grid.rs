//! Grid engine error types

use crate::column::ColumnId;

use super::LoadError;

/// Errors returned by grid commands.
///
/// Everything except [`GridError::Load`] is a programmer or configuration
/// mistake: the call fails synchronously and leaves the grid untouched.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A key-based or tree operation was invoked without a configured row key.
    #[error("row-key is required for {operation}")]
    RowKeyRequired {
        /// The operation that needed row identities.
        operation: &'static str,
    },

    /// A lazy tree node was expanded but no loader is installed.
    #[error("row `{key}` is lazy but no tree loader is installed")]
    LoaderRequired {
        /// Identity of the lazy row.
        key: String,
    },

    /// The loader resolved to something other than an array of rows.
    #[error("loader for row `{key}` resolved to {found}, expected an array of rows")]
    LoaderContract {
        /// Identity of the row being loaded.
        key: String,
        /// JSON type name of what the loader returned.
        found: &'static str,
    },

    /// No column matches the given column key, id or property.
    #[error("no column matching key `{0}`")]
    UnknownColumnKey(String),

    /// A column id is not registered.
    #[error("column {0} is not registered")]
    UnknownColumn(ColumnId),

    /// The loader rejected.
    #[error("loading children of row `{key}` failed: {source}")]
    Load {
        /// Identity of the row being loaded.
        key: String,
        /// The loader's own error.
        #[source]
        source: LoadError,
    },
}

impl GridError {
    /// Creates a row-key-required error.
    pub fn row_key_required(operation: &'static str) -> Self {
        Self::RowKeyRequired { operation }
    }

    /// Creates a loader contract violation for the given payload.
    pub fn loader_contract(key: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self::LoaderContract {
            key: key.into(),
            found: crate::model::type_name(payload),
        }
    }

    /// Returns `true` for errors caused by missing grid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GridError::RowKeyRequired { .. } | GridError::LoaderRequired { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;
