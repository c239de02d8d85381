//! Storage factories handed to components that need namespaced storage
//!
//! Components receive an `Arc<dyn StorageFactory>` instead of reaching for a
//! global resolver. [`ScopedStorageFactory`] is the usual implementation: it
//! owns the user-facing `persist` semantics (including `persist = true`) and
//! forwards to one shared [`StorageResolver`].

use crate::config::{Persist, ResolverConfig};
use crate::error::Result;
use crate::resolver::{StorageHandle, StorageResolver};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of namespaced storage
#[async_trait]
pub trait StorageFactory: Send + Sync {
    /// Storage for `namespace` under the given persistence directive
    async fn storage(&self, namespace: &str, persist: Option<&Persist>) -> Result<StorageHandle>;

    /// Release resources shared between handles
    async fn dispose(&self) -> Result<()>;
}

#[async_trait]
impl StorageFactory for StorageResolver {
    async fn storage(&self, namespace: &str, persist: Option<&Persist>) -> Result<StorageHandle> {
        self.resolve(namespace, persist).await
    }

    async fn dispose(&self) -> Result<()> {
        StorageResolver::dispose(self).await
    }
}

/// Factory for one component (`scope`) over a shared resolver.
///
/// - `persist = false` or no directive selects in-memory storage;
/// - `persist = true` selects `<default_persist_root>/<scope>`;
/// - strings are passed through.
///
/// Namespaces are prefixed with `<scope>:` so components sharing a resolver
/// never see each other's data. The `persist = true` root already names the
/// scope, so those namespaces go in unprefixed; either way a component's
/// files under `<default_persist_root>` end up in
/// `<default_persist_root>/<scope>/<namespace>`.
#[derive(Debug, Clone)]
pub struct ScopedStorageFactory {
    resolver: Arc<StorageResolver>,
    scope: String,
    default_root: PathBuf,
}

impl ScopedStorageFactory {
    /// Create a factory for `scope`. `default_persist_root` is the directory
    /// `persist = true` is stored under.
    pub fn new(
        resolver: Arc<StorageResolver>,
        scope: impl Into<String>,
        default_persist_root: impl AsRef<Path>,
    ) -> Self {
        let scope = scope.into();
        let default_root = default_persist_root.as_ref().join(&scope);
        Self {
            resolver,
            scope,
            default_root,
        }
    }

    /// Create a factory using the default root from `config`
    pub fn from_config(resolver: Arc<StorageResolver>, scope: impl Into<String>, config: &ResolverConfig) -> Self {
        Self::new(resolver, scope, &config.default_persist_root)
    }

    /// Scope namespaces are prefixed with
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Root used for `persist = true`
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    /// Namespace as seen by the resolver
    pub fn scoped_namespace(&self, namespace: &str) -> String {
        format!("{}:{}", self.scope, namespace)
    }
}

#[async_trait]
impl StorageFactory for ScopedStorageFactory {
    async fn storage(&self, namespace: &str, persist: Option<&Persist>) -> Result<StorageHandle> {
        let namespace = match persist {
            Some(Persist::Flag(true)) => namespace.to_string(),
            _ => self.scoped_namespace(namespace),
        };
        let persist = Persist::normalize(persist, &self.default_root);
        debug!(namespace = %namespace, persist = ?persist, "resolving scoped storage");
        self.resolver.resolve(&namespace, persist.as_ref()).await
    }

    /// The shared resolver is disposed by its owner, not by each scope
    async fn dispose(&self) -> Result<()> {
        Ok(())
    }
}
