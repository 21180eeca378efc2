//! Collection list cache
//!
//! One cached sorted list per collection, reconciled in place as mutations
//! go through instead of invalidated wholesale. This is the server-side
//! version of what every admin editor used to do ad hoc with its own copy
//! of the list: upsert the row the server returned, drop the row that was
//! deleted, re-sort after a reorder.
//!
//! ## Staleness contract
//!
//! The resequence path updates the cache *before* the store write is known
//! to have succeeded, and a failed write is not rolled back here. A cached
//! list can therefore run ahead of the store until its TTL expires or a
//! caller forces a refetch (`GET /api/<collection>?refresh=true`). That
//! mirrors how the admin panel behaves: the list re-sorts immediately and
//! a persistence failure is only repaired by a manual refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::{display_cmp, OrderAssignment, Row};

/// Configuration for the content cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached list stays servable
    pub ttl: Duration,
    /// Interval for the background cleanup task
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

struct Entry {
    rows: Vec<Row>,
    cached_at: Instant,
}

/// Cache of sorted collection lists, keyed by collection name
pub struct ContentCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ContentCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached list for a collection, if present and fresh
    pub async fn get(&self, collection: &str) -> Option<Vec<Row>> {
        let entries = self.entries.read().await;
        let entry = entries.get(collection)?;
        if entry.cached_at.elapsed() >= self.config.ttl {
            return None;
        }
        Some(entry.rows.clone())
    }

    /// Store a freshly fetched list
    pub async fn put_list(&self, collection: &str, rows: Vec<Row>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            collection.to_string(),
            Entry {
                rows,
                cached_at: Instant::now(),
            },
        );
    }

    /// Upsert one server-returned row and restore display order
    pub async fn apply_row(&self, collection: &str, row: &Row) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(collection) {
            match entry.rows.iter_mut().find(|cached| cached.id == row.id) {
                Some(cached) => *cached = row.clone(),
                None => entry.rows.push(row.clone()),
            }
            entry.rows.sort_by(display_cmp);
        }
    }

    /// Drop one row from the cached list
    pub async fn remove_by_id(&self, collection: &str, id: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(collection) {
            entry.rows.retain(|cached| cached.id != id);
        }
    }

    /// Apply new order values to matching rows and re-sort.
    ///
    /// Called before the store write completes; see the staleness contract
    /// in the module docs.
    pub async fn apply_orders(&self, collection: &str, pairs: &[OrderAssignment]) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(collection) {
            for pair in pairs {
                if let Some(cached) = entry.rows.iter_mut().find(|row| row.id == pair.id) {
                    cached.order = pair.order;
                }
            }
            entry.rows.sort_by(display_cmp);
        }
    }

    /// Forget a collection entirely
    pub async fn invalidate(&self, collection: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(collection).is_some() {
            debug!(collection = collection, "Cache entry invalidated");
        }
    }

    /// Number of collections currently cached
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Remove expired entries
    pub async fn cleanup(&self) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.config.ttl;
        entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);

        let evicted = before - entries.len();
        if evicted > 0 {
            info!(evicted = evicted, remaining = entries.len(), "Cache cleanup");
        }
    }
}

/// Spawn the periodic cleanup task
pub fn spawn_cleanup_task(cache: Arc<ContentCache>) -> tokio::task::JoinHandle<()> {
    let interval = cache.config.cleanup_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            cache.cleanup().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn row(id: &str, order: i64) -> Row {
        Row {
            id: id.to_string(),
            order,
            fields: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = ContentCache::new(CacheConfig::default());
        cache.put_list("projects", vec![row("a", 1), row("b", 2)]).await;

        let rows = cache.get("projects").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(cache.get("quotes").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_served() {
        let cache = ContentCache::new(CacheConfig {
            ttl: Duration::from_millis(10),
            ..Default::default()
        });
        cache.put_list("projects", vec![row("a", 1)]).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("projects").await.is_none());

        cache.cleanup().await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_apply_row_upserts_and_resorts() {
        let cache = ContentCache::new(CacheConfig::default());
        cache.put_list("projects", vec![row("a", 1), row("b", 2)]).await;

        // New row lands in order position
        cache.apply_row("projects", &row("c", 0)).await;
        let ids: Vec<String> = cache
            .get("projects")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        // Existing row is replaced, not duplicated
        cache.apply_row("projects", &row("a", 9)).await;
        let rows = cache.get("projects").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.last().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_apply_row_on_uncached_collection_is_noop() {
        let cache = ContentCache::new(CacheConfig::default());
        cache.apply_row("projects", &row("a", 1)).await;
        // No entry is created from a single row; the next list fetch fills it
        assert!(cache.get("projects").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let cache = ContentCache::new(CacheConfig::default());
        cache.put_list("projects", vec![row("a", 1), row("b", 2)]).await;

        cache.remove_by_id("projects", "a").await;
        let rows = cache.get("projects").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }

    #[tokio::test]
    async fn test_invalidate_forgets_collection() {
        let cache = ContentCache::new(CacheConfig::default());
        cache.put_list("projects", vec![row("a", 1)]).await;
        cache.put_list("quotes", vec![row("b", 1)]).await;

        cache.invalidate("projects").await;
        assert!(cache.get("projects").await.is_none());
        assert!(cache.get("quotes").await.is_some());
        assert_eq!(cache.entry_count().await, 1);

        // Unknown collection is a no-op
        cache.invalidate("team_members").await;
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_apply_orders_resorts_optimistically() {
        let cache = ContentCache::new(CacheConfig::default());
        cache
            .put_list("projects", vec![row("a", 1), row("b", 2), row("c", 3)])
            .await;

        cache
            .apply_orders(
                "projects",
                &[
                    OrderAssignment { id: "a".into(), order: 3 },
                    OrderAssignment { id: "c".into(), order: 1 },
                ],
            )
            .await;

        let ids: Vec<String> = cache
            .get("projects")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
