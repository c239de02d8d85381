//! Synapsed Storage Resolver - namespaced storage backends for the Synapsed
//! ecosystem
//!
//! Given a namespace and a persistence directive, [`StorageResolver`] picks
//! one of several interchangeable key-value backends and manages the shared
//! resources behind them:
//!
//! | Directive                   | Backend                                  |
//! |-----------------------------|------------------------------------------|
//! | none                        | in-memory, cached per namespace          |
//! | `redis://…` / `rediss://…`  | Redis, one connection per URL (`redis`)  |
//! | any other string            | files under `<dir>/<sanitized namespace>`|
//!
//! ```no_run
//! # async fn demo() -> synapsed_storage_resolver::Result<()> {
//! use synapsed_storage_resolver::prelude::*;
//!
//! let resolver = StorageResolver::new();
//! let users = resolver.resolve("users", None).await?;
//! users.put(b"alice", b"admin").await?;
//!
//! let files = resolver.resolve("users", Some(&Persist::location("./data"))).await?;
//! files.put(b"alice", b"admin").await?;
//!
//! resolver.dispose().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backends;
pub mod config;
pub mod directive;
pub mod error;
pub mod factory;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod utils;

// Re-export commonly used types
pub use config::{MemoryConfig, Persist, ResolverConfig};
pub use directive::{BackendKind, Directive};
pub use error::{Result, StorageError};
pub use factory::{ScopedStorageFactory, StorageFactory};
pub use registry::BackendRegistry;
pub use resolver::{ResolverBuilder, ResolverStats, StorageHandle, StorageResolver};
pub use traits::{RemoteConnection, RemoteConnector, Storage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        config::{Persist, ResolverConfig},
        error::{Result, StorageError},
        factory::{ScopedStorageFactory, StorageFactory},
        resolver::{StorageHandle, StorageResolver},
        traits::Storage,
    };
}
