use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The filter or pipeline could not be interpreted by the store.
    InvalidQuery(String),
    /// The store does not implement a requested operator or stage.
    Unsupported(String),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidQuery(msg) => write!(f, "invalid query: {msg}"),
            StoreError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(feature = "memory")]
impl From<parley_query::FilterParseError> for StoreError {
    fn from(e: parley_query::FilterParseError) -> Self {
        StoreError::InvalidQuery(e.to_string())
    }
}
