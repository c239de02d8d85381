//! Lazily loaded remote backends, keyed by connection-string scheme

use crate::error::{Result, StorageError};
use crate::traits::RemoteConnector;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Constructor for a remote backend, run on first use of its scheme
pub type ConnectorLoader = Arc<dyn Fn() -> Result<Arc<dyn RemoteConnector>> + Send + Sync>;

struct Entry {
    loader: ConnectorLoader,
    loaded: OnceCell<Arc<dyn RemoteConnector>>,
}

/// Maps connection-string schemes to remote backends.
///
/// Registering a scheme only stores its loader. The loader runs the first
/// time a connection for that scheme is needed; backends that are never used
/// are never initialised.
#[derive(Default)]
pub struct BackendRegistry {
    remotes: HashMap<String, Entry>,
}

impl BackendRegistry {
    /// Registry with no backends
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every remote backend compiled into this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin();
        registry
    }

    #[cfg(feature = "redis")]
    fn register_builtin(&mut self) {
        for scheme in ["redis", "rediss"] {
            self.register(scheme, || {
                Ok(Arc::new(crate::backends::RedisConnector) as Arc<dyn RemoteConnector>)
            });
        }
    }

    #[cfg(not(feature = "redis"))]
    fn register_builtin(&mut self) {}

    /// Register `loader` for `scheme`, replacing any previous registration
    pub fn register<F>(&mut self, scheme: impl Into<String>, loader: F)
    where
        F: Fn() -> Result<Arc<dyn RemoteConnector>> + Send + Sync + 'static,
    {
        self.remotes.insert(
            scheme.into(),
            Entry {
                loader: Arc::new(loader),
                loaded: OnceCell::new(),
            },
        );
    }

    /// Whether a backend is registered for `scheme`
    pub fn supports(&self, scheme: &str) -> bool {
        self.remotes.contains_key(scheme)
    }

    /// Whether the backend for `scheme` has been initialised
    pub fn is_loaded(&self, scheme: &str) -> bool {
        self.remotes
            .get(scheme)
            .is_some_and(|entry| entry.loaded.get().is_some())
    }

    /// Connector for `scheme`, running its loader on first call.
    ///
    /// A loader failure is returned unchanged and the loader runs again on
    /// the next call.
    pub fn connector(&self, scheme: &str) -> Result<Arc<dyn RemoteConnector>> {
        let entry = self
            .remotes
            .get(scheme)
            .ok_or_else(|| StorageError::BackendUnavailable(scheme.to_string()))?;

        entry
            .loaded
            .get_or_try_init(|| {
                debug!(scheme, "loading remote storage backend");
                (entry.loader)()
            })
            .cloned()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.remotes.keys().collect();
        schemes.sort();
        f.debug_struct("BackendRegistry").field("schemes", &schemes).finish()
    }
}
