//! # Track Cache
//!
//! Whole-track cache over a host [`BlobStore`], with oldest-first eviction.
//!
//! Every store failure is logged with `warn!` and swallowed: the cache is an
//! optimisation and must never be the reason a track fails to play.

use crate::cache::{config::CacheConfig, stats::CacheStats};
use crate::error::{PlaybackError, Result};
use bridge_traits::{BlobStore, MemoryByteStream};
use bytes::Bytes;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Offline cache of compressed track bodies keyed by URL.
pub struct TrackCache {
    store: Arc<dyn BlobStore>,
    config: CacheConfig,
    event_bus: Option<EventBus>,
    /// Cached URLs, oldest first. `None` until first loaded from the store.
    index: Mutex<Option<VecDeque<String>>>,
    stats: Mutex<CacheStats>,
}

impl TrackCache {
    pub fn new(store: Arc<dyn BlobStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            event_bus: None,
            index: Mutex::new(None),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Publish `CacheEvent`s on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Cached body for `url`, or `None` on a miss, a disabled cache or a store error.
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn lookup(&self, url: &str) -> Option<Bytes> {
        if !self.config.enabled {
            return None;
        }

        match self.store.get(url).await {
            Ok(Some(body)) => {
                self.stats.lock().hits += 1;
                debug!(bytes = body.len(), "Cache hit");
                self.emit(CacheEvent::Hit {
                    url: redact_url(url),
                    bytes: body.len() as u64,
                });
                Some(body)
            }
            Ok(None) => {
                self.stats.lock().misses += 1;
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, treating as miss");
                let mut stats = self.stats.lock();
                stats.misses += 1;
                stats.failures += 1;
                None
            }
        }
    }

    /// Cached body for `url` as a byte stream chunked by `cached_chunk_bytes`.
    pub async fn open(&self, url: &str) -> Option<MemoryByteStream> {
        let body = self.lookup(url).await?;
        Some(MemoryByteStream::chunked(body, self.config.cached_chunk_bytes))
    }

    /// Store a completed body, evicting the oldest entries beyond `max_entries`.
    ///
    /// Returns `true` if the body was stored.
    #[instrument(skip(self, url, body), fields(url = %redact_url(url), bytes = body.len()))]
    pub async fn store(&self, url: &str, body: Bytes) -> bool {
        if !self.config.enabled {
            return false;
        }

        if body.len() as u64 > self.config.max_entry_bytes {
            self.stats.lock().oversized_skipped += 1;
            debug!(
                max_entry_bytes = self.config.max_entry_bytes,
                "Body too large to cache"
            );
            return false;
        }

        self.ensure_index().await;

        let bytes = body.len() as u64;
        if let Err(e) = self.store.put(url, body).await {
            warn!(error = %e, "Cache store failed");
            self.stats.lock().failures += 1;
            return false;
        }

        self.stats.lock().stores += 1;
        info!("Track cached");
        self.emit(CacheEvent::Stored {
            url: redact_url(url),
            bytes,
        });

        let victims = {
            let mut guard = self.index.lock();
            let index = guard.get_or_insert_with(VecDeque::new);
            index.retain(|cached| cached != url);
            index.push_back(url.to_string());

            let excess = index.len().saturating_sub(self.config.max_entries);
            index.drain(..excess).collect::<Vec<_>>()
        };

        for victim in victims {
            match self.store.delete(&victim).await {
                Ok(_) => self.record_eviction(&victim),
                Err(e) => {
                    warn!(victim = %redact_url(&victim), error = %e, "Cache eviction failed");
                    self.stats.lock().failures += 1;
                }
            }
        }

        true
    }

    /// Remove `url` from the cache. Returns `true` if it was cached.
    pub async fn evict(&self, url: &str) -> Result<bool> {
        let removed = self
            .store
            .delete(url)
            .await
            .map_err(|e| PlaybackError::Cache(format!("Failed to evict {}: {}", redact_url(url), e)))?;

        if let Some(index) = self.index.lock().as_mut() {
            index.retain(|cached| cached != url);
        }
        if removed {
            self.record_eviction(url);
        }
        Ok(removed)
    }

    /// URLs currently held by the store.
    pub async fn cached_urls(&self) -> Result<Vec<String>> {
        self.store
            .list()
            .await
            .map_err(|e| PlaybackError::Cache(format!("Failed to list cache: {}", e)))
    }

    /// Remove every cached track, returning how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let urls = self.cached_urls().await?;
        let mut removed = 0;
        for url in &urls {
            if self.evict(url).await? {
                removed += 1;
            }
        }
        *self.index.lock() = Some(VecDeque::new());
        info!(removed, "Cache cleared");
        Ok(removed)
    }

    async fn ensure_index(&self) {
        if self.index.lock().is_some() {
            return;
        }

        let existing = match self.store.list().await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(error = %e, "Failed to load cache index, starting empty");
                Vec::new()
            }
        };

        let mut guard = self.index.lock();
        if guard.is_none() {
            *guard = Some(existing.into_iter().collect());
        }
    }

    fn record_eviction(&self, url: &str) {
        self.stats.lock().evictions += 1;
        debug!(url = %redact_url(url), "Evicted cached track");
        self.emit(CacheEvent::Evicted {
            url: redact_url(url),
        });
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::ByteStream;
    use std::collections::BTreeMap;

    /// In-memory store that keeps keys sorted, like the filesystem store.
    #[derive(Default)]
    struct MemoryStore {
        blobs: Mutex<BTreeMap<String, Bytes>>,
        fail_puts: bool,
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
            Ok(self.blobs.lock().get(key).cloned())
        }

        async fn put(&self, key: &str, data: Bytes) -> BridgeResult<()> {
            if self.fail_puts {
                return Err(BridgeError::OperationFailed("disk full".to_string()));
            }
            self.blobs.lock().insert(key.to_string(), data);
            Ok(())
        }

        async fn delete(&self, key: &str) -> BridgeResult<bool> {
            Ok(self.blobs.lock().remove(key).is_some())
        }

        async fn list(&self) -> BridgeResult<Vec<String>> {
            Ok(self.blobs.lock().keys().cloned().collect())
        }
    }

    fn cache(config: CacheConfig) -> (Arc<MemoryStore>, TrackCache) {
        let store = Arc::new(MemoryStore::default());
        let cache = TrackCache::new(store.clone(), config);
        (store, cache)
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let (_, cache) = cache(CacheConfig::default());
        assert!(cache.lookup("https://a/1.dfpwm").await.is_none());

        assert!(cache.store("https://a/1.dfpwm", Bytes::from_static(b"\x00\xff")).await);
        assert_eq!(
            cache.lookup("https://a/1.dfpwm").await,
            Some(Bytes::from_static(b"\x00\xff"))
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stores, 1);
    }

    #[tokio::test]
    async fn test_evicts_oldest_beyond_max_entries() {
        let (store, cache) = cache(CacheConfig::default().with_max_entries(2));
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let cache = cache.with_event_bus(bus);

        // Insertion order, not key order, decides eviction.
        cache.store("c", Bytes::from_static(b"3")).await;
        cache.store("a", Bytes::from_static(b"1")).await;
        cache.store("c", Bytes::from_static(b"3")).await;
        cache.store("b", Bytes::from_static(b"2")).await;

        assert_eq!(store.list().await.unwrap(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(cache.stats().evictions, 1);

        let mut evicted = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CoreEvent::Cache(CacheEvent::Evicted { url }) = event {
                evicted.push(url);
            }
        }
        assert_eq!(evicted, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_index_loaded_from_existing_store() {
        let store = Arc::new(MemoryStore::default());
        store.put("old-1", Bytes::from_static(b"x")).await.unwrap();
        store.put("old-2", Bytes::from_static(b"y")).await.unwrap();

        let cache = TrackCache::new(store.clone(), CacheConfig::default().with_max_entries(2));
        cache.store("new", Bytes::from_static(b"z")).await;

        assert_eq!(
            store.list().await.unwrap(),
            vec!["new".to_string(), "old-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_oversized_and_disabled() {
        let (store, cache) = cache(CacheConfig::default().with_max_entry_bytes(4));
        assert!(!cache.store("big", Bytes::from_static(b"12345")).await);
        assert_eq!(cache.stats().oversized_skipped, 1);

        let disabled = TrackCache::new(store.clone(), CacheConfig::disabled());
        assert!(!disabled.store("small", Bytes::from_static(b"1")).await);
        assert!(store.list().await.unwrap().is_empty());
        assert!(disabled.lookup("small").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = Arc::new(MemoryStore {
            fail_puts: true,
            ..Default::default()
        });
        let cache = TrackCache::new(store, CacheConfig::default());

        assert!(!cache.store("u", Bytes::from_static(b"1")).await);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_open_replays_in_chunks() {
        let (_, cache) = cache(CacheConfig::default().with_cached_chunk_bytes(2));
        cache.store("u", Bytes::from_static(b"\x01\x02\x03\x04\x05")).await;

        let mut stream = cache.open("u").await.unwrap();
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_evict_and_clear() {
        let (_, cache) = cache(CacheConfig::default());
        cache.store("a", Bytes::from_static(b"1")).await;
        cache.store("b", Bytes::from_static(b"2")).await;

        assert!(cache.evict("a").await.unwrap());
        assert!(!cache.evict("a").await.unwrap());
        assert_eq!(cache.cached_urls().await.unwrap(), vec!["b".to_string()]);

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.cached_urls().await.unwrap().is_empty());
    }
}
