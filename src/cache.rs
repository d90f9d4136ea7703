// src/cache.rs

//! Read-through cache for backend collections.
//!
//! Each collection is kept as `{dir}/{key}.json` together with the time it
//! was fetched. Entries younger than the staleness window are served without
//! touching the backend; older entries are refetched and overwritten. When a
//! refetch fails the stale copy is served instead of the error.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::utils::fs;

/// A cached collection snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct CachedCollection<T> {
    /// When the items were fetched from the backend
    pub fetched_at: DateTime<Utc>,
    /// Number of items at fetch time
    pub count: usize,
    /// The cached rows
    pub items: Vec<T>,
}

impl<T> CachedCollection<T> {
    /// Whether the snapshot is still inside the staleness window.
    pub fn is_fresh(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age <= staleness,
            // Fetched "in the future": clock skew, treat as fresh
            Err(_) => true,
        }
    }
}

/// Borrowed form written to disk.
#[derive(Serialize)]
struct CachedCollectionRef<'a, T> {
    fetched_at: DateTime<Utc>,
    count: usize,
    items: &'a [T],
}

/// File-backed cache keyed by collection name.
#[derive(Debug, Clone)]
pub struct CollectionCache {
    root: PathBuf,
    staleness: Duration,
}

impl CollectionCache {
    pub fn new(root: impl Into<PathBuf>, staleness: Duration) -> Self {
        Self {
            root: root.into(),
            staleness,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Read a snapshot regardless of its age. Unreadable entries count as missing.
    pub async fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<CachedCollection<T>> {
        match fs::read_json(&self.path(key)).await {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry '{key}': {e}");
                None
            }
        }
    }

    /// Read a snapshot only if it is inside the staleness window.
    pub async fn fresh<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        self.peek::<T>(key)
            .await
            .filter(|entry| entry.is_fresh(Utc::now(), self.staleness))
            .map(|entry| entry.items)
    }

    /// Overwrite a snapshot with freshly fetched items.
    pub async fn store<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let entry = CachedCollectionRef {
            fetched_at: Utc::now(),
            count: items.len(),
            items,
        };
        fs::write_json(&self.path(key), &entry).await
    }

    /// Drop a snapshot so the next read goes to the backend.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        fs::remove_file(&self.path(key)).await
    }

    /// Serve `key` from the cache, or fetch, store and return it.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<T>>> + Send,
    {
        if let Some(items) = self.fresh(key).await {
            log::debug!("Cache hit for '{key}' ({} items)", items.len());
            return Ok(items);
        }

        match fetch().await {
            Ok(items) => {
                if let Err(e) = self.store(key, &items).await {
                    log::warn!("Failed to cache '{key}': {e}");
                }
                Ok(items)
            }
            Err(err) => match self.peek::<T>(key).await {
                Some(stale) => {
                    log::warn!(
                        "Fetching '{key}' failed ({err}); serving {} cached items from {}",
                        stale.count,
                        stale.fetched_at
                    );
                    Ok(stale.items)
                }
                None => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let tmp = TempDir::new().unwrap();
        let cache = CollectionCache::new(tmp.path(), Duration::from_secs(300));

        cache.store("books", &["a".to_string()]).await.unwrap();
        let items: Vec<String> = cache
            .get_or_fetch("books", || async { Err(AppError::backend(500, "unreachable")) })
            .await
            .unwrap();
        assert_eq!(items, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let cache = CollectionCache::new(tmp.path(), Duration::ZERO);

        cache.store("books", &["old".to_string()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let items: Vec<String> = cache
            .get_or_fetch("books", || async { Ok(vec!["new".to_string()]) })
            .await
            .unwrap();
        assert_eq!(items, vec!["new".to_string()]);

        let entry = cache.peek::<String>("books").await.unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.items, vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_stale_copy() {
        let tmp = TempDir::new().unwrap();
        let cache = CollectionCache::new(tmp.path(), Duration::ZERO);

        cache.store("students", &[1u32, 2]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let items: Vec<u32> = cache
            .get_or_fetch("students", || async { Err(AppError::backend(503, "down")) })
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_missing_entry_propagates_error() {
        let tmp = TempDir::new().unwrap();
        let cache = CollectionCache::new(tmp.path(), Duration::from_secs(300));

        let result: Result<Vec<u32>> = cache
            .get_or_fetch("students", || async { Err(AppError::backend(503, "down")) })
            .await;
        assert!(result.unwrap_err().is_network());

        cache.store("students", &[1u32]).await.unwrap();
        cache.invalidate("students").await.unwrap();
        assert!(cache.peek::<u32>("students").await.is_none());
    }
}
