//! Configuration structures for the resolver and its backends

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Persistence directive as it appears in user configuration.
///
/// Configuration files may say `persist = true` as well as
/// `persist = "redis://..."` or `persist = "./data"`, so both shapes
/// deserialize into this type. Only [`Persist::Location`] is accepted by the
/// resolver itself; flags are normalised by
/// [`ScopedStorageFactory`](crate::factory::ScopedStorageFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Persist {
    /// Boolean persistence flag
    Flag(bool),
    /// Connection string or filesystem root
    Location(String),
}

impl Persist {
    /// Create a location directive
    pub fn location(value: impl Into<String>) -> Self {
        Persist::Location(value.into())
    }

    /// Turn a possibly boolean directive into the shape the resolver accepts.
    ///
    /// `false` means no persistence, `true` selects `default_root`.
    pub fn normalize(persist: Option<&Persist>, default_root: &Path) -> Option<Persist> {
        match persist {
            None | Some(Persist::Flag(false)) => None,
            Some(Persist::Flag(true)) => {
                Some(Persist::Location(default_root.to_string_lossy().into_owned()))
            }
            Some(location @ Persist::Location(_)) => Some(location.clone()),
        }
    }
}

impl From<&str> for Persist {
    fn from(value: &str) -> Self {
        Persist::Location(value.to_string())
    }
}

impl From<String> for Persist {
    fn from(value: String) -> Self {
        Persist::Location(value)
    }
}

impl From<bool> for Persist {
    fn from(value: bool) -> Self {
        Persist::Flag(value)
    }
}

impl fmt::Display for Persist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persist::Flag(flag) => write!(f, "{flag}"),
            Persist::Location(location) => f.write_str(location),
        }
    }
}

/// Configuration for in-memory storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Initial capacity for the memory map
    #[serde(default = "default_memory_capacity")]
    pub initial_capacity: usize,

    /// Maximum memory usage in bytes (0 = unlimited)
    #[serde(default)]
    pub max_memory_bytes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_memory_capacity(),
            max_memory_bytes: 0,
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Settings applied to every in-memory store the resolver creates
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Directory that `persist = true` maps to
    #[serde(default = "default_persist_root")]
    pub default_persist_root: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            default_persist_root: default_persist_root(),
        }
    }
}

impl ResolverConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// Default value functions
fn default_memory_capacity() -> usize {
    1024
}

fn default_persist_root() -> PathBuf {
    PathBuf::from(".synapsed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_persist_deserializes_from_bool_or_string() {
        let flag: Persist = serde_json::from_str("true").unwrap();
        assert_eq!(flag, Persist::Flag(true));

        let location: Persist = serde_json::from_str("\"redis://localhost:6379\"").unwrap();
        assert_eq!(location, Persist::location("redis://localhost:6379"));
    }

    #[test]
    fn test_normalize() {
        let root = Path::new("/var/lib/app");
        assert_eq!(Persist::normalize(None, root), None);
        assert_eq!(Persist::normalize(Some(&Persist::Flag(false)), root), None);
        assert_eq!(
            Persist::normalize(Some(&Persist::Flag(true)), root),
            Some(Persist::location("/var/lib/app"))
        );
        assert_eq!(
            Persist::normalize(Some(&Persist::location("./data")), root),
            Some(Persist::location("./data"))
        );
    }

    #[test]
    fn test_resolver_config_defaults() {
        let config = ResolverConfig::from_json("{}").unwrap();
        assert_eq!(config.memory.initial_capacity, 1024);
        assert_eq!(config.memory.max_memory_bytes, 0);
        assert_eq!(config.default_persist_root, PathBuf::from(".synapsed"));

        let config =
            ResolverConfig::from_json(r#"{"memory": {"max_memory_bytes": 64}, "default_persist_root": "/tmp/x"}"#)
                .unwrap();
        assert_eq!(config.memory.max_memory_bytes, 64);
        assert_eq!(config.default_persist_root, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_invalid_config_is_serialization_error() {
        let err = ResolverConfig::from_json("{\"memory\": 3}").unwrap_err();
        assert!(matches!(err, crate::StorageError::Serialization(_)));
    }
}
