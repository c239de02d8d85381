//! Resolution of (namespace, persistence directive) pairs to storage handles
//!
//! The resolver is the single place where the backend for a namespace is
//! chosen and where shared backend resources live:
//!
//! - no directive: one [`MemoryStorage`] per namespace, kept for the
//!   lifetime of the resolver so data survives repeated resolution;
//! - `redis://` / `rediss://`: one connection per connection string, shared
//!   by every namespace, wrapped in a fresh [`RemoteStorage`] per call;
//! - anything else: a new [`FileStorage`] rooted at
//!   `<directive>/<sanitized namespace>`, never cached.

use crate::backends::{FileStorage, MemoryStorage, RemoteStorage};
use crate::config::{MemoryConfig, Persist, ResolverConfig};
use crate::directive::{BackendKind, Directive};
use crate::error::{Result, StorageError};
use crate::registry::BackendRegistry;
use crate::traits::{RemoteConnection, RemoteConnector, Storage};
use crate::utils::join_namespace;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Per connection string slot. Concurrent resolutions of the same URL wait
/// on the same cell, so a connection is only ever opened once.
type ConnectionSlot = Arc<OnceCell<Arc<dyn RemoteConnection>>>;

/// Handle returned by [`StorageResolver::resolve`]
#[derive(Debug, Clone)]
pub enum StorageHandle {
    /// Cached in-memory store
    Memory(Arc<MemoryStorage>),
    /// Namespace view over a shared remote connection
    Remote(RemoteStorage),
    /// Directory-rooted file store
    File(FileStorage),
}

impl StorageHandle {
    /// Backend kind behind this handle
    pub fn kind(&self) -> BackendKind {
        match self {
            StorageHandle::Memory(_) => BackendKind::Memory,
            StorageHandle::Remote(_) => BackendKind::Remote,
            StorageHandle::File(_) => BackendKind::File,
        }
    }

    /// The in-memory store, if this is a memory handle
    pub fn as_memory(&self) -> Option<&Arc<MemoryStorage>> {
        match self {
            StorageHandle::Memory(storage) => Some(storage),
            _ => None,
        }
    }

    /// The remote wrapper, if this is a remote handle
    pub fn as_remote(&self) -> Option<&RemoteStorage> {
        match self {
            StorageHandle::Remote(storage) => Some(storage),
            _ => None,
        }
    }

    /// The file store, if this is a file handle
    pub fn as_file(&self) -> Option<&FileStorage> {
        match self {
            StorageHandle::File(storage) => Some(storage),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Storage {
        match self {
            StorageHandle::Memory(storage) => storage.as_ref(),
            StorageHandle::Remote(storage) => storage,
            StorageHandle::File(storage) => storage,
        }
    }
}

#[async_trait]
impl Storage for StorageHandle {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.inner().get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner().put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner().delete(key).await
    }

    async fn list(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.inner().list(prefix).await
    }

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        self.inner().exists(key).await
    }

    async fn flush(&self) -> Result<()> {
        self.inner().flush().await
    }
}

/// Counters describing resolver activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Memory resolutions served from the cache
    pub memory_hits: u64,
    /// Memory resolutions that created a store
    pub memory_misses: u64,
    /// Remote connections opened
    pub connections_opened: u64,
    /// File handles constructed
    pub file_handles: u64,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    connections_opened: AtomicU64,
    file_handles: AtomicU64,
}

/// Resolves namespaces to storage backends and owns their shared resources
pub struct StorageResolver {
    memory_config: MemoryConfig,
    memory_storages: DashMap<String, Arc<MemoryStorage>>,
    connections: DashMap<String, ConnectionSlot>,
    registry: BackendRegistry,
    counters: Counters,
}

impl StorageResolver {
    /// Resolver with empty caches and every built-in backend
    pub fn new() -> Self {
        ResolverBuilder::new().build()
    }

    /// Resolver configured from a [`ResolverConfig`]
    pub fn from_config(config: &ResolverConfig) -> Self {
        ResolverBuilder::new()
            .with_memory_config(config.memory.clone())
            .build()
    }

    /// Start building a resolver
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Resolve `namespace` under `persist` to a storage handle.
    ///
    /// A [`Persist::Flag`] is rejected with
    /// [`StorageError::BooleanDirective`](crate::StorageError::BooleanDirective);
    /// callers must normalise flags first. Failures from remote backends
    /// propagate unchanged.
    #[instrument(level = "debug", skip(self, persist))]
    pub async fn resolve(&self, namespace: &str, persist: Option<&Persist>) -> Result<StorageHandle> {
        let directive = Directive::classify(persist)?;
        metrics::counter!("storage_resolver.resolve", "backend" => directive.kind().to_string())
            .increment(1);

        match directive {
            Directive::Memory => Ok(StorageHandle::Memory(self.memory_storage(namespace))),
            Directive::Remote { scheme, url } => {
                let connection = self.connection(scheme, url).await?;
                Ok(StorageHandle::Remote(RemoteStorage::new(connection, namespace)))
            }
            Directive::File { root } => {
                self.counters.file_handles.fetch_add(1, Ordering::Relaxed);
                Ok(StorageHandle::File(FileStorage::new(join_namespace(root, namespace))))
            }
        }
    }

    fn memory_storage(&self, namespace: &str) -> Arc<MemoryStorage> {
        if let Some(storage) = self.memory_storages.get(namespace) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            return storage.value().clone();
        }

        // Another caller may have inserted since the lookup; the entry API
        // keeps whichever store got there first
        self.memory_storages
            .entry(namespace.to_string())
            .or_insert_with(|| {
                debug!(namespace, "creating in-memory storage");
                self.counters.memory_misses.fetch_add(1, Ordering::Relaxed);
                Arc::new(MemoryStorage::new(self.memory_config.clone()))
            })
            .value()
            .clone()
    }

    async fn connection(&self, scheme: &str, url: &str) -> Result<Arc<dyn RemoteConnection>> {
        // Clone the slot out so no map guard is held across the await
        let slot: ConnectionSlot = self.connections.entry(url.to_string()).or_default().value().clone();

        let opened = slot
            .get_or_try_init(|| async {
                let connector = self.registry.connector(scheme)?;
                info!(scheme, "opening shared remote connection");
                let connection = connector.connect(url).await?;
                self.counters.connections_opened.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("storage_resolver.connections_opened").increment(1);
                Ok::<_, StorageError>(connection)
            })
            .await;

        match opened {
            Ok(connection) => Ok(connection.clone()),
            Err(err) => {
                // Drop the empty slot unless another caller is still waiting
                // on it; clones only come out of the map, so the count is
                // stable while the shard is locked
                self.connections.remove_if(url, |_, entry| {
                    Arc::ptr_eq(entry, &slot) && Arc::strong_count(entry) == 2 && !entry.initialized()
                });
                Err(err)
            }
        }
    }

    #[cfg(test)]
    fn connection_slots(&self) -> usize {
        self.connections.len()
    }

    /// Close every shared remote connection.
    ///
    /// All connections are attempted; the first failure is returned. Memory
    /// stores are left alone, and the connection cache is not cleared.
    #[instrument(level = "debug", skip(self))]
    pub async fn dispose(&self) -> Result<()> {
        let connections: Vec<Arc<dyn RemoteConnection>> = self
            .connections
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();

        info!(connections = connections.len(), "disposing storage resolver");
        let results = join_all(connections.iter().map(|connection| connection.disconnect())).await;
        metrics::counter!("storage_resolver.disposed").increment(1);

        let mut first_error = None;
        for (connection, result) in connections.iter().zip(results) {
            if let Err(err) = result {
                warn!(scheme = connection_scheme(connection.url()), error = %err, "failed to close remote connection");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Namespaces with a cached in-memory store, sorted
    pub fn memory_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> =
            self.memory_storages.iter().map(|entry| entry.key().clone()).collect();
        namespaces.sort();
        namespaces
    }

    /// Number of open (or pre-seeded) remote connections
    pub fn connection_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Shared connection for `url`, if one has been opened
    pub fn connection_for(&self, url: &str) -> Option<Arc<dyn RemoteConnection>> {
        self.connections
            .get(url)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Snapshot of resolver counters
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            memory_misses: self.counters.memory_misses.load(Ordering::Relaxed),
            connections_opened: self.counters.connections_opened.load(Ordering::Relaxed),
            file_handles: self.counters.file_handles.load(Ordering::Relaxed),
        }
    }
}

/// Scheme part of a connection string; the rest may carry credentials
fn connection_scheme(url: &str) -> &str {
    url.split_once("://").map_or(url, |(scheme, _)| scheme)
}

impl Default for StorageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StorageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageResolver")
            .field("memory_namespaces", &self.memory_storages.len())
            .field("connections", &self.connection_count())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Builder for [`StorageResolver`], including pre-seeded caches
pub struct ResolverBuilder {
    memory_config: MemoryConfig,
    memory_storages: HashMap<String, Arc<MemoryStorage>>,
    connections: HashMap<String, Arc<dyn RemoteConnection>>,
    registry: BackendRegistry,
}

impl ResolverBuilder {
    /// Builder with empty caches and the built-in backend registry
    pub fn new() -> Self {
        Self {
            memory_config: MemoryConfig::default(),
            memory_storages: HashMap::new(),
            connections: HashMap::new(),
            registry: BackendRegistry::with_builtin(),
        }
    }

    /// Configuration for in-memory stores created by the resolver
    pub fn with_memory_config(mut self, config: MemoryConfig) -> Self {
        self.memory_config = config;
        self
    }

    /// Pre-seed the memory cache
    pub fn with_memory_storage(mut self, namespace: impl Into<String>, storage: Arc<MemoryStorage>) -> Self {
        self.memory_storages.insert(namespace.into(), storage);
        self
    }

    /// Pre-seed the connection cache
    pub fn with_connection(mut self, url: impl Into<String>, connection: Arc<dyn RemoteConnection>) -> Self {
        self.connections.insert(url.into(), connection);
        self
    }

    /// Replace the backend registry
    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a lazily constructed connector for `scheme`
    pub fn with_remote_connector<F>(mut self, scheme: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RemoteConnector>> + Send + Sync + 'static,
    {
        self.registry.register(scheme, loader);
        self
    }

    /// Build the resolver
    pub fn build(self) -> StorageResolver {
        StorageResolver {
            memory_config: self.memory_config,
            memory_storages: self.memory_storages.into_iter().collect(),
            connections: self
                .connections
                .into_iter()
                .map(|(url, connection)| (url, Arc::new(OnceCell::new_with(Some(connection)))))
                .collect(),
            registry: self.registry,
            counters: Counters::default(),
        }
    }
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
