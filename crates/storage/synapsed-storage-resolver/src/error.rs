//! Error types for storage resolution and the bundled backends

use thiserror::Error;

/// Type alias for Results using StorageError
pub type Result<T> = std::result::Result<T, StorageError>;

/// Main error type for resolver and storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// A boolean persistence flag reached the resolver.
    ///
    /// Callers must normalise `persist = true/false` into either no directive
    /// or a concrete root path before resolving. This is a programming error,
    /// not a condition to recover from.
    #[error("boolean persistence directive must be normalised before resolution")]
    BooleanDirective,

    /// Directive that cannot name any backend
    #[error("Invalid persistence directive: {0:?}")]
    InvalidDirective(String),

    /// The directive names a recognised backend that is not compiled in
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Network-related error (remote backends)
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage is full
    #[error("Storage is full")]
    StorageFull,

    /// Key not found
    #[error("Key not found")]
    NotFound,

    /// Invalid key format
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error with custom message
    #[error("{0}")]
    Other(String),
}

/// Backend-specific errors
#[derive(Error, Debug)]
pub enum BackendError {
    /// Redis error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// File backend error
    #[error("File backend error: {0}")]
    File(String),

    /// Generic backend error
    #[error("Backend error: {0}")]
    Other(String),
}

/// Errors raised by shared remote connections
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Command issued on a connection that was already disconnected
    #[error("Connection to {0} is closed")]
    Closed(String),

    /// Network timeout
    #[error("Network timeout")]
    Timeout,
}

impl StorageError {
    /// Check if the error is a caller contract violation rather than a
    /// runtime failure
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, StorageError::BooleanDirective)
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Network(NetworkError::Connection(_) | NetworkError::Timeout)
        )
    }

    /// Check if the error indicates data not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(s: String) -> Self {
        StorageError::Other(s)
    }
}

impl From<&str> for StorageError {
    fn from(s: &str) -> Self {
        StorageError::Other(s.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        StorageError::Backend(BackendError::Redis(err))
    }
}
