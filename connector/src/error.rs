//! Error types for connector operations.

use common::StoreError;

/// Error type for connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An error reported by the record store, with its status code.
    Store { code: i32, message: String },

    /// Connecting to the store failed, or no connection became available.
    Connection(String),

    /// A `where` or filter shape the store cannot answer.
    UnsupportedQuery(String),

    /// A key that cannot address a record.
    InvalidKey(String),

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// The addressed record does not exist.
    NotFound(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl Error {
    /// Returns the store status code, if this error came from the store.
    pub fn store_code(&self) -> Option<i32> {
        match self {
            Error::Store { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Store { code, message } => write!(f, "Store error {}: {}", code, message),
            Error::Connection(msg) => write!(f, "Connection error: {}", msg),
            Error::UnsupportedQuery(msg) => write!(f, "Unsupported query: {}", msg),
            Error::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store {
            code: err.code,
            message: err.message,
        }
    }
}

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, Error>;
