//! Redis-backed remote connection
//!
//! One [`RedisConnection`] is shared by every namespace resolved against the
//! same connection string. Keys are stored as `<len>:<namespace>:<key>`,
//! where `<len>` is the byte length of the namespace, so a namespace that
//! contains `:` can never match the key space of another namespace.

use crate::error::{NetworkError, Result};
use crate::traits::{RemoteConnection, RemoteConnector};
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const SCAN_BATCH: usize = 100;

/// Shared multiplexed Redis connection.
///
/// The URL is validated when the connection is opened; the socket itself is
/// established on the first command.
pub struct RedisConnection {
    url: String,
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
}

impl RedisConnection {
    /// Validate `url` and prepare a connection for it
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            url: url.to_string(),
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether [`disconnect`](RemoteConnection::disconnect) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if self.is_closed() {
            return Err(NetworkError::Closed(self.url.clone()).into());
        }
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        debug!(url = %self.url, "establishing redis connection");
        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

fn namespaced_key(namespace: &str, key: &[u8]) -> Vec<u8> {
    let mut full = format!("{}:{}:", namespace.len(), namespace).into_bytes();
    full.extend_from_slice(key);
    full
}

/// Key part of a stored key, if it belongs to `namespace`
fn key_in_namespace(full: &[u8], namespace: &str) -> Option<Vec<u8>> {
    full.strip_prefix(namespaced_key(namespace, b"").as_slice())
        .map(<[u8]>::to_vec)
}

/// Escape Redis glob metacharacters so `bytes` matches literally
fn escape_glob(bytes: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'*' | b'?' | b'[' | b']' | b'\\' | b'^') {
            escaped.push(b'\\');
        }
        escaped.push(b);
    }
    escaped
}

#[async_trait]
impl RemoteConnection for RedisConnection {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(namespaced_key(namespace, key))
            .query_async(&mut conn)
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(namespaced_key(namespace, key))
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &[u8]) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(namespaced_key(namespace, key))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list(&self, namespace: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let mut pattern = escape_glob(&namespaced_key(namespace, prefix));
        pattern.push(b'*');

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|full| key_in_namespace(&full, namespace)),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(url = %self.url, "closing redis connection");
        }
        // Dropping the last handle shuts the multiplexed connection down
        guard.take();
        Ok(())
    }
}

/// Opens [`RedisConnection`]s for `redis://` and `rediss://` URLs
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnector;

#[async_trait]
impl RemoteConnector for RedisConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RemoteConnection>> {
        Ok(Arc::new(RedisConnection::open(url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key("users", b"42"), b"5:users:42".to_vec());
        assert_eq!(namespaced_key("", b"k"), b"0::k".to_vec());
        assert_eq!(namespaced_key("kv:users", b"x"), b"8:kv:users:x".to_vec());
    }

    #[test]
    fn test_nested_namespaces_do_not_overlap() {
        let archived = namespaced_key("kv:users:archive", b"x");
        assert_eq!(key_in_namespace(&archived, "kv:users"), None);
        assert_eq!(key_in_namespace(&archived, "kv"), None);
        assert_eq!(key_in_namespace(&archived, "kv:users:archive"), Some(b"x".to_vec()));

        let stored = namespaced_key("a:b", b"c");
        assert_eq!(key_in_namespace(&stored, "a"), None);
        assert_eq!(key_in_namespace(&namespaced_key("a", b"b:c"), "a"), Some(b"b:c".to_vec()));
    }

    #[test]
    fn test_scan_pattern_is_namespace_exact() {
        let mut pattern = escape_glob(&namespaced_key("kv:users", b""));
        pattern.push(b'*');
        assert_eq!(pattern, b"8:kv:users:*".to_vec());
        assert!(!namespaced_key("kv:users:archive", b"x").starts_with(b"8:kv:users:"));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob(b"a*b?c"), b"a\\*b\\?c".to_vec());
        assert_eq!(escape_glob(b"[x]"), b"\\[x\\]".to_vec());
        assert_eq!(escape_glob(b"plain"), b"plain".to_vec());
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected_on_connect() {
        let err = RedisConnector
            .connect("redis://localhost:notaport")
            .await
            .err()
            .expect("malformed url should fail");
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_blocks_commands() {
        let conn = RedisConnection::open("redis://127.0.0.1:6379").unwrap();
        conn.disconnect().await.unwrap();
        conn.disconnect().await.unwrap();
        assert!(conn.is_closed());

        let err = conn.get("ns", b"key").await.unwrap_err();
        assert!(matches!(err, StorageError::Network(NetworkError::Closed(_))));
    }
}
