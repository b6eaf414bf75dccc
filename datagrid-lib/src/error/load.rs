//! Lazy loader error types

/// Operational failure reported by a [`TreeLoader`](crate::tree::TreeLoader).
///
/// The engine never retries or logs these; they are handed back to whoever
/// awaited the load so they can decide whether to expand the row again.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    /// Human-readable failure message.
    pub message: String,
}

impl LoadError {
    /// Creates a new load error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for LoadError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for LoadError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
