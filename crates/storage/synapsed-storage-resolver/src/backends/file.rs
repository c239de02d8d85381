//! File-system storage backend
//!
//! Each key is stored as one file directly under the store root. File names
//! are the hex encoding of the key, so arbitrary binary keys are safe on any
//! file system. Keys are limited to [`MAX_KEY_LEN`] bytes so the encoded name
//! fits the usual 255-byte file name limit. The root directory is only
//! created on the first write.

use crate::error::{BackendError, Result, StorageError};
use crate::traits::Storage;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Longest key accepted, in bytes
pub const MAX_KEY_LEN: usize = 127;

/// Directory-rooted file storage
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `root`. No I/O happens until first use.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory this store keeps its files in
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &[u8]) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey(format!(
                "key is {} bytes, at most {MAX_KEY_LEN} allowed",
                key.len()
            )));
        }
        Ok(self.root.join(hex::encode(key)))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        match fs::read(self.key_path(key)?).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.root).await?;

        // Write next to the target and rename so readers never see a torn
        // value. Each writer gets its own temp file; the last rename wins.
        let tmp = self.root.join(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        match fs::remove_file(self.key_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            // Skips in-progress `.tmp` files and anything not written by us
            let Ok(key) = hex::decode(name) else { continue };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        let path = self.key_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(true),
            Ok(_) => Err(BackendError::File(format!("{} is not a file", path.display())).into()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_root_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("never-created"));

        assert!(storage.get(b"key").await.unwrap().is_none());
        assert!(storage.list(b"").await.unwrap().is_empty());
        assert!(!storage.exists(b"key").await.unwrap());
        assert!(!storage.root().exists());
    }

    #[tokio::test]
    async fn test_put_creates_root_and_persists() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a").join("b");

        FileStorage::new(&root).put(b"key", b"value").await.unwrap();
        assert!(root.is_dir());

        // A fresh handle on the same root sees the data
        let reopened = FileStorage::new(&root);
        assert_eq!(reopened.get(b"key").await.unwrap(), Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn test_binary_keys_and_list() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.put(&[0, 1, 2], b"x").await.unwrap();
        storage.put(b"../escape", b"y").await.unwrap();
        storage.put(b"other", b"z").await.unwrap();

        let keys = storage.list(&[0]).await.unwrap();
        assert_eq!(keys, vec![vec![0u8, 1, 2]]);
        assert_eq!(storage.get(b"../escape").await.unwrap(), Some(Bytes::from("y")));
        assert_eq!(storage.list(b"").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.put(b"key", b"value").await.unwrap();
        storage.delete(b"key").await.unwrap();
        assert!(storage.get(b"key").await.unwrap().is_none());
        storage.delete(b"key").await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_puts_to_one_key() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        let writes = (0..16u8).map(|i| {
            let storage = storage.clone();
            async move { storage.put(b"shared", &[i]).await }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let value = storage.get(b"shared").await.unwrap().unwrap();
        assert_eq!(value.len(), 1);
        assert!(value[0] < 16);
        // No temp files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(storage.list(b"").await.unwrap(), vec![b"shared".to_vec()]);
    }

    #[tokio::test]
    async fn test_key_length_limit() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        let longest = vec![b'k'; MAX_KEY_LEN];
        storage.put(&longest, b"v").await.unwrap();
        assert_eq!(storage.get(&longest).await.unwrap(), Some(Bytes::from("v")));

        let too_long = vec![b'k'; MAX_KEY_LEN + 1];
        let err = storage.put(&too_long, b"v").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(matches!(
            storage.get(&too_long).await.unwrap_err(),
            StorageError::InvalidKey(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        let err = storage.put(b"", b"value").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
