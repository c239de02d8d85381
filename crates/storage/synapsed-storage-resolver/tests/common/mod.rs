//! Common test utilities and fixtures for synapsed-storage-resolver

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synapsed_storage_resolver::error::NetworkError;
use synapsed_storage_resolver::{
    BackendRegistry, RemoteConnection, RemoteConnector, Result, StorageError, StorageResolver,
};
use tracing_subscriber::EnvFilter;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("synapsed_storage_resolver=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

/// In-process stand-in for a remote store
pub struct MockConnection {
    url: String,
    data: Mutex<BTreeMap<(String, Vec<u8>), Vec<u8>>>,
    disconnects: AtomicUsize,
    closed: Mutex<bool>,
}

impl MockConnection {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            data: Mutex::new(BTreeMap::new()),
            disconnects: AtomicUsize::new(0),
            closed: Mutex::new(false),
        }
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.closed.lock() {
            return Err(NetworkError::Closed(self.url.clone()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteConnection for MockConnection {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self
            .data
            .lock()
            .get(&(namespace.to_string(), key.to_vec()))
            .map(|v| Bytes::copy_from_slice(v)))
    }

    async fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.data
            .lock()
            .insert((namespace.to_string(), key.to_vec()), value.to_vec());
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.data.lock().remove(&(namespace.to_string(), key.to_vec()));
        Ok(())
    }

    async fn list(&self, namespace: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self
            .data
            .lock()
            .keys()
            .filter(|(ns, key)| ns == namespace && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Connector that records every connection it opens
#[derive(Default)]
pub struct MockConnector {
    opened: Mutex<Vec<Arc<MockConnection>>>,
    connect_delay: Option<Duration>,
    fail_with: Option<String>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector whose connects take `delay`, to widen race windows
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            connect_delay: Some(delay),
            ..Self::default()
        })
    }

    /// Connector that refuses every connection
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        })
    }

    /// Connector that refuses the first `failures` connections, then recovers
    pub fn flaky(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        })
    }

    /// Number of `connect` calls, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<Arc<MockConnection>> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl RemoteConnector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RemoteConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StorageError::Network(NetworkError::Connection(format!(
                "temporarily unavailable: {url}"
            ))));
        }
        if let Some(message) = &self.fail_with {
            return Err(StorageError::Network(NetworkError::Connection(format!(
                "{message}: {url}"
            ))));
        }
        let connection = Arc::new(MockConnection::new(url));
        self.opened.lock().push(connection.clone());
        Ok(connection)
    }
}

/// Resolver whose `redis` and `rediss` schemes are served by `connector`
pub fn resolver_with(connector: &Arc<MockConnector>) -> StorageResolver {
    let redis = connector.clone();
    let rediss = connector.clone();
    StorageResolver::builder()
        .with_registry(BackendRegistry::empty())
        .with_remote_connector("redis", move || Ok(redis.clone() as Arc<dyn RemoteConnector>))
        .with_remote_connector("rediss", move || Ok(rediss.clone() as Arc<dyn RemoteConnector>))
        .build()
}

/// Generate a unique namespace
pub fn unique_namespace(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
