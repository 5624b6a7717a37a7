//! Raw document cache for repeated fetches of the same identifier group

use std::fmt::Debug;
use std::hash::Hash;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::config::CacheConfig;
use crate::database::Database;

/// In-memory cache backed by Moka
#[derive(Clone)]
pub struct MemoryCache<K, V> {
    cache: MokaCache<K, V>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live)
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let result = self.cache.get(key).await;
        debug!(?key, hit = result.is_some(), "Cache lookup");
        result
    }

    pub async fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Flush pending maintenance so `entry_count` is current
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Raw EFetch documents keyed by [`document_key`]
pub type DocumentCache = MemoryCache<String, Vec<u8>>;

/// Cache key of one EFetch request: `db:id1,id2,...`
///
/// Identifier order is part of the key, since it decides record order in the
/// returned document.
pub fn document_key(database: Database, ids: &[String]) -> String {
    format!("{database}:{}", ids.join(","))
}
