//! Namespace-scoped view over a shared remote connection

use crate::error::Result;
use crate::traits::{RemoteConnection, Storage};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Storage for one namespace multiplexed over a shared [`RemoteConnection`].
///
/// Wrappers are cheap and never cached; only the connection is shared.
#[derive(Clone)]
pub struct RemoteStorage {
    connection: Arc<dyn RemoteConnection>,
    namespace: String,
}

impl RemoteStorage {
    /// Scope `connection` to `namespace`
    pub fn new(connection: Arc<dyn RemoteConnection>, namespace: impl Into<String>) -> Self {
        Self {
            connection,
            namespace: namespace.into(),
        }
    }

    /// Namespace this wrapper is scoped to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The shared underlying connection
    pub fn connection(&self) -> &Arc<dyn RemoteConnection> {
        &self.connection
    }
}

impl fmt::Debug for RemoteStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStorage")
            .field("url", &self.connection.url())
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl Storage for RemoteStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.connection.get(&self.namespace, key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.connection.put(&self.namespace, key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.connection.delete(&self.namespace, key).await
    }

    async fn list(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.connection.list(&self.namespace, prefix).await
    }
}
