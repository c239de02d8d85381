//! Core traits shared by the resolver and every backend

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Storage capability contract that all backends implement.
///
/// A handle is always scoped to one namespace; keys never leak between
/// namespaces.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// Store a key-value pair
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key
    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// List keys starting with `prefix`, in ascending byte order
    async fn list(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Check if a key exists
    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Flush any pending writes
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A shared connection to a remote key-value store.
///
/// One connection is multiplexed across many namespaces, so every operation
/// takes the namespace explicitly.
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    /// Connection string this connection was opened with
    fn url(&self) -> &str;

    /// Get a value in `namespace`
    async fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Bytes>>;

    /// Store a value in `namespace`
    async fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key in `namespace`
    async fn delete(&self, namespace: &str, key: &[u8]) -> Result<()>;

    /// List keys in `namespace` starting with `prefix`, sorted
    async fn list(&self, namespace: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Close the connection.
    ///
    /// Must tolerate being called more than once.
    async fn disconnect(&self) -> Result<()>;
}

/// Opens [`RemoteConnection`]s for one connection-string scheme
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Open a connection for `url`
    async fn connect(&self, url: &str) -> Result<Arc<dyn RemoteConnection>>;
}
