//! Durable key-value storage for the auto-reconnect flag.
//!
//! The browser keeps this in `localStorage`; here it sits behind the
//! [`FlagStore`] trait so hosts can choose where it lives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageResult;

/// Value written when the flag is set.
const FLAG_TRUE: &str = "true";

/// Trait for string key-value storage backends.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-memory storage.
///
/// Not persistent across restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// File-based storage.
///
/// Keeps every key in a single JSON object file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// File name used inside the state directory.
    pub const FILE_NAME: &'static str = "storage.json";

    /// Create a store backed by `dir/storage.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(Self::FILE_NAME),
            lock: RwLock::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_all(&self) -> StorageResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(values)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl FlagStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_owned(), value.to_owned());
        self.write_all(&values).await?;
        debug!(key = %key, path = %self.path.display(), "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            self.write_all(&values).await?;
            debug!(key = %key, path = %self.path.display(), "removed value");
        }
        Ok(())
    }
}

/// The durable "attempt silent reconnect on load" flag.
///
/// Storage failures are logged and treated as an unset flag; they never
/// abort a session operation.
#[derive(Clone)]
pub struct AutoReconnect {
    store: Arc<dyn FlagStore>,
    key: String,
}

impl std::fmt::Debug for AutoReconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoReconnect")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl AutoReconnect {
    /// Bind the flag to a store and key.
    pub fn new(store: Arc<dyn FlagStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the flag is set.
    pub async fn is_set(&self) -> bool {
        match self.store.get(&self.key).await {
            Ok(value) => value.as_deref() == Some(FLAG_TRUE),
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read auto-reconnect flag");
                false
            }
        }
    }

    /// Set the flag.
    pub async fn enable(&self) {
        if let Err(e) = self.store.set(&self.key, FLAG_TRUE).await {
            warn!(key = %self.key, error = %e, "failed to persist auto-reconnect flag");
        }
    }

    /// Clear the flag.
    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key).await {
            warn!(key = %self.key, error = %e, "failed to clear auto-reconnect flag");
        }
    }
}
