//! In-memory storage backend

use crate::config::MemoryConfig;
use crate::error::{Result, StorageError};
use crate::traits::Storage;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory storage implementation
#[derive(Debug)]
pub struct MemoryStorage {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    config: MemoryConfig,
}

impl MemoryStorage {
    /// Create a new memory storage instance with config
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            config,
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn size_bytes(data: &HashMap<Vec<u8>, Vec<u8>>) -> usize {
        data.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.data.read().get(key).map(|v| Bytes::copy_from_slice(v)))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write();

        if self.config.max_memory_bytes > 0 {
            let old_entry_size = data.get(key).map_or(0, |v| key.len() + v.len());
            let projected = Self::size_bytes(&data) - old_entry_size + key.len() + value.len();
            if projected > self.config.max_memory_bytes {
                return Err(StorageError::StorageFull);
            }
        }

        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys: Vec<Vec<u8>> = self
            .data
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }
}
