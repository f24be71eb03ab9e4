//! Persisted key-value store the provider client uses to remember a session across
//! restarts. Only the provider client reads or writes it; the sign-up flow merely
//! hands a cache over when the client is constructed.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// Key under which the active session identifier is stored.
pub const SESSION_KEY: &str = "__session";

#[derive(Debug, Error)]
pub enum TokenCacheError {
    #[error("token cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("token cache is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenCacheError>;
    async fn save(&self, key: &str, value: &str) -> Result<(), TokenCacheError>;
    async fn clear(&self, key: &str) -> Result<(), TokenCacheError>;
}

/// Process-local cache, forgotten on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenCacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), TokenCacheError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), TokenCacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Cache stored as a flat JSON object in a single file.
/// A missing file reads as an empty cache; parent directories are created on save.
#[derive(Debug)]
pub struct FileTokenCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, TokenCacheError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, entries: &HashMap<String, String>) -> Result<(), TokenCacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self, key: &str) -> Result<Option<String>, TokenCacheError> {
        Ok(self.load().await?.remove(key))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn save(&self, key: &str, value: &str) -> Result<(), TokenCacheError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries).await?;
        debug!("token cache entry saved");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self, key: &str) -> Result<(), TokenCacheError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.store(&entries).await?;
            debug!("token cache entry cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn temp_cache_path(label: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("enroll-token-cache-{label}-{}", Ulid::new()))
            .join("tokens.json")
    }

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = MemoryTokenCache::default();
        assert_eq!(cache.get(SESSION_KEY).await.unwrap(), None);

        cache.save(SESSION_KEY, "sess_1").await.unwrap();
        assert_eq!(
            cache.get(SESSION_KEY).await.unwrap(),
            Some("sess_1".to_string())
        );

        cache.clear(SESSION_KEY).await.unwrap();
        assert_eq!(cache.get(SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_cache_missing_file_reads_empty() {
        let cache = FileTokenCache::new(temp_cache_path("missing"));
        assert_eq!(cache.get(SESSION_KEY).await.unwrap(), None);
        // Clearing a missing key must not create the file.
        cache.clear(SESSION_KEY).await.unwrap();
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn file_cache_persists_across_instances() {
        let path = temp_cache_path("persist");
        let first = FileTokenCache::new(&path);
        first.save(SESSION_KEY, "sess_1").await.unwrap();
        first.save("other", "value").await.unwrap();

        let second = FileTokenCache::new(&path);
        assert_eq!(
            second.get(SESSION_KEY).await.unwrap(),
            Some("sess_1".to_string())
        );

        second.clear(SESSION_KEY).await.unwrap();
        assert_eq!(first.get(SESSION_KEY).await.unwrap(), None);
        assert_eq!(first.get("other").await.unwrap(), Some("value".to_string()));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn file_cache_reports_corrupt_contents() {
        let path = temp_cache_path("corrupt");
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).unwrap();
        }
        std::fs::write(&path, "not json").unwrap();

        let cache = FileTokenCache::new(&path);
        assert!(matches!(
            cache.get(SESSION_KEY).await,
            Err(TokenCacheError::Json(_))
        ));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
