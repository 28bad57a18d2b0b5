//! In-memory image cache with byte-budget LRU eviction.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::{Image, ImageRequest, UrlId};

/// Default hard ceiling that triggers eviction: 100 MB.
pub const DEFAULT_MEMORY_CAPACITY: u64 = 100 * 1024 * 1024;

/// Default floor eviction drains down to: 60 MB.
pub const DEFAULT_PREFERRED_MEMORY_USAGE_AFTER_PURGE: u64 = 60 * 1024 * 1024;

/// Computes the cache key for a URL and optional filter identifier.
///
/// `"<url>"` with no filter, `"<url>-<identifier>"` otherwise.
#[must_use]
pub fn cache_key(url_id: &UrlId, filter_identifier: Option<&str>) -> String {
    match filter_identifier {
        Some(identifier) => format!("{}-{identifier}", url_id.as_str()),
        None => url_id.as_str().to_string(),
    }
}

struct CachedImage {
    image: Image,
    total_bytes: u64,
    last_accessed: Instant,
    // Strictly monotone access stamp; eviction orders by this so ties on
    // the clock stay deterministic.
    stamp: u64,
}

struct CacheInner {
    images: HashMap<String, CachedImage>,
    memory_usage: u64,
    clock: u64,
}

impl CacheInner {
    fn touch(&mut self) -> (Instant, u64) {
        self.clock += 1;
        (Instant::now(), self.clock)
    }
}

/// Keyed image store that purges least-recently-used entries once a memory
/// budget is exceeded.
///
/// Reads and writes go through a reader-writer lock; an insert and any
/// eviction it triggers are observed atomically by other writers.
pub struct AutoPurgingImageCache {
    memory_capacity: u64,
    preferred_memory_usage_after_purge: u64,
    inner: RwLock<CacheInner>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl AutoPurgingImageCache {
    /// Creates a cache with the given ceiling and post-purge floor.
    ///
    /// # Panics
    /// Panics unless `memory_capacity >= preferred_memory_usage_after_purge`.
    #[must_use]
    pub fn new(memory_capacity: u64, preferred_memory_usage_after_purge: u64) -> Self {
        assert!(
            memory_capacity >= preferred_memory_usage_after_purge,
            "memory capacity must be at least the preferred usage after purge"
        );
        Self {
            memory_capacity,
            preferred_memory_usage_after_purge,
            inner: RwLock::new(CacheInner {
                images: HashMap::new(),
                memory_usage: 0,
                clock: 0,
            }),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// The hard ceiling that triggers eviction.
    #[must_use]
    pub const fn memory_capacity(&self) -> u64 {
        self.memory_capacity
    }

    /// The floor eviction drains down to.
    #[must_use]
    pub const fn preferred_memory_usage_after_purge(&self) -> u64 {
        self.preferred_memory_usage_after_purge
    }

    /// Current memory usage snapshot in bytes.
    pub async fn memory_usage(&self) -> u64 {
        self.inner.read().await.memory_usage
    }

    /// Number of cached images.
    pub async fn len(&self) -> usize {
        self.inner.read().await.images.len()
    }

    /// True if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.images.is_empty()
    }

    /// Stores `image` under `key`, replacing any previous entry.
    ///
    /// If the insert pushes usage past the ceiling, least-recently-accessed
    /// entries are evicted until usage is at or below the post-purge floor.
    pub async fn add(&self, image: Image, key: impl Into<String>) {
        let key = key.into();
        let mut inner = self.inner.write().await;
        let (last_accessed, stamp) = inner.touch();

        let total_bytes = image.total_bytes();
        if let Some(previous) = inner.images.remove(&key) {
            inner.memory_usage -= previous.total_bytes;
        }
        inner.memory_usage += total_bytes;
        inner.images.insert(
            key.clone(),
            CachedImage {
                image,
                total_bytes,
                last_accessed,
                stamp,
            },
        );
        trace!(key = %key, bytes = total_bytes, "Cached image");

        if inner.memory_usage > self.memory_capacity {
            self.purge_locked(&mut inner);
        }
    }

    /// Stores `image` keyed by `request` and an optional filter identifier.
    pub async fn add_for_request(
        &self,
        image: Image,
        request: &ImageRequest,
        filter_identifier: Option<&str>,
    ) {
        self.add(image, cache_key(&request.url_id(), filter_identifier))
            .await;
    }

    /// Returns the image under `key`, bumping its recency.
    ///
    /// Never evicts.
    pub async fn get(&self, key: &str) -> Option<Image> {
        let mut inner = self.inner.write().await;
        let (now, stamp) = inner.touch();
        if let Some(entry) = inner.images.get_mut(key) {
            entry.last_accessed = now;
            entry.stamp = stamp;
            self.hits
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            trace!(key = %key, "Image cache hit");
            Some(entry.image.clone())
        } else {
            self.misses
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            trace!(key = %key, "Image cache miss");
            None
        }
    }

    /// Returns the image cached for `request` and an optional filter
    /// identifier.
    pub async fn get_for_request(
        &self,
        request: &ImageRequest,
        filter_identifier: Option<&str>,
    ) -> Option<Image> {
        self.get(&cache_key(&request.url_id(), filter_identifier))
            .await
    }

    /// Removes the entry under `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.images.remove(key) {
            inner.memory_usage -= entry.total_bytes;
            debug!(key = %key, "Removed cached image");
            true
        } else {
            false
        }
    }

    /// Removes the entry keyed by `request` and an optional filter
    /// identifier. Returns whether one existed.
    pub async fn remove_for_request(
        &self,
        request: &ImageRequest,
        filter_identifier: Option<&str>,
    ) -> bool {
        self.remove(&cache_key(&request.url_id(), filter_identifier))
            .await
    }

    /// Removes every entry whose key starts with `url`, covering all filter
    /// variants of one resource. Returns whether anything was removed.
    pub async fn remove_with_prefix(&self, url: &str) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.images.len();
        let mut freed = 0;
        inner.images.retain(|key, entry| {
            if key.starts_with(url) {
                freed += entry.total_bytes;
                false
            } else {
                true
            }
        });
        inner.memory_usage -= freed;
        let removed = inner.images.len() != before;
        if removed {
            debug!(prefix = %url, bytes = freed, "Removed cached images by prefix");
        }
        removed
    }

    /// Drops every entry. Returns whether anything was removed.
    pub async fn clear(&self) -> bool {
        let mut inner = self.inner.write().await;
        let removed = !inner.images.is_empty();
        inner.images.clear();
        inner.memory_usage = 0;
        if removed {
            debug!("Cleared image cache");
        }
        removed
    }

    /// Returns hit/miss statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(std::sync::atomic::Ordering::Relaxed);
        let misses = self.misses.load(std::sync::atomic::Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
        }
    }

    fn purge_locked(&self, inner: &mut CacheInner) {
        let mut order: Vec<(String, u64, u64)> = inner
            .images
            .iter()
            .map(|(key, entry)| (key.clone(), entry.stamp, entry.total_bytes))
            .collect();
        order.sort_by_key(|(_, stamp, _)| *stamp);

        let before = inner.memory_usage;
        for (key, _, bytes) in order {
            if inner.memory_usage <= self.preferred_memory_usage_after_purge {
                break;
            }
            inner.images.remove(&key);
            inner.memory_usage -= bytes;
            trace!(key = %key, bytes, "Evicted least-recently-used image");
        }
        debug!(
            before,
            after = inner.memory_usage,
            "Purged image cache past capacity"
        );
    }
}

impl Default for AutoPurgingImageCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_MEMORY_CAPACITY,
            DEFAULT_PREFERRED_MEMORY_USAGE_AFTER_PURGE,
        )
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {:.1}% hit rate ({} hits, {} misses)",
            self.hit_rate, self.hits, self.misses
        )
    }
}
