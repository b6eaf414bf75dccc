//! Lazy child loaders.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::LoadError;
use crate::model::Row;

/// Loads the children of a lazy tree row.
///
/// The loader must resolve to a JSON array of child rows. Anything else is
/// reported as a contract violation by the grid.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use datagrid_lib::tree::TreeLoader;
/// use datagrid_lib::error::LoadError;
/// use datagrid_lib::model::Row;
///
/// struct ApiLoader {
///     client: MyClient,
/// }
///
/// #[async_trait]
/// impl TreeLoader for ApiLoader {
///     async fn load(&self, _row: &Row, key: &str, _all: &[Row]) -> Result<serde_json::Value, LoadError> {
///         self.client.children_of(key).await.map_err(|e| LoadError::new(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait TreeLoader: Send + Sync {
    /// Fetches the children of `row`, whose identity is `key`.
    ///
    /// `all_rows` is the grid's current raw data.
    async fn load(&self, row: &Row, key: &str, all_rows: &[Row]) -> Result<Value, LoadError>;
}

type LoadFn = dyn Fn(Row, String, Vec<Row>) -> BoxFuture<'static, Result<Value, LoadError>> + Send + Sync;

/// A [`TreeLoader`] backed by an async closure. Built with [`loader_fn`].
pub struct FnLoader {
    f: Box<LoadFn>,
}

impl std::fmt::Debug for FnLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnLoader(..)")
    }
}

/// Wraps an async closure `(row, key, all_rows)` as a loader.
///
/// # Example
///
/// ```
/// use datagrid_lib::tree::loader_fn;
/// use serde_json::json;
///
/// let loader = loader_fn(|_row, key, _all| async move {
///     Ok(json!([{ "id": format!("{key}-1") }]))
/// });
/// ```
pub fn loader_fn<F, Fut>(f: F) -> FnLoader
where
    F: Fn(Row, String, Vec<Row>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, LoadError>> + Send + 'static,
{
    FnLoader {
        f: Box::new(move |row, key, all| f(row, key, all).boxed()),
    }
}

#[async_trait]
impl TreeLoader for FnLoader {
    async fn load(&self, row: &Row, key: &str, all_rows: &[Row]) -> Result<Value, LoadError> {
        (self.f)(row.clone(), key.to_string(), all_rows.to_vec()).await
    }
}

/// A loader serving fixed children per row identity.
///
/// Unknown identities resolve to an empty list.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    children: HashMap<String, Value>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the payload returned for `key`.
    pub fn with_children(mut self, key: impl Into<String>, children: Value) -> Self {
        self.children.insert(key.into(), children);
        self
    }
}

#[async_trait]
impl TreeLoader for StaticLoader {
    async fn load(&self, _row: &Row, key: &str, _all_rows: &[Row]) -> Result<Value, LoadError> {
        Ok(self
            .children
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }
}
