use crate::background::BackgroundTask;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for the cache system
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    pub capacity: usize,
    /// How long an entry stays fresh after it was stored or last read
    pub ttl: Duration,
    /// How often the background sweep purges stale entries
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, capacity: usize, sweep_interval: Duration) -> Self {
        Self {
            capacity,
            ttl,
            sweep_interval,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub current_size: usize,
}

struct Entry<V> {
    value: V,
    refreshed_at: Instant,
}

impl<V> Entry<V> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.refreshed_at) < ttl
    }
}

/// Bounded in-memory cache with least-recently-used eviction and per-entry
/// time-to-live.
///
/// Reads refresh both recency and the entry's age, so an entry that keeps
/// being read stays resident. Stale entries are dropped lazily on access and
/// eagerly by [`TtlLruCache::purge_stale`], which the background sweep calls.
pub struct TtlLruCache<K, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    current_size: AtomicUsize,
}

impl<K, V> TtlLruCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let config = CacheConfig {
            capacity: capacity.get(),
            ..config
        };
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            current_size: AtomicUsize::new(0),
        }
    }

    /// Get a fresh value, counting a hit or a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let fresh = entries
            .peek(key)
            .map(|entry| entry.is_fresh(self.config.ttl, now));
        let value = match fresh {
            Some(true) => entries.get_mut(key).map(|entry| {
                entry.refreshed_at = now;
                entry.value.clone()
            }),
            Some(false) => {
                entries.pop(key);
                log::debug!("Cache expired for key: {:?}", key);
                None
            }
            None => None,
        };
        self.current_size.store(entries.len(), Ordering::Relaxed);
        drop(entries);

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache hit for key: {:?}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache miss for key: {:?}", key);
        }
        value
    }

    /// Get a fresh value without recording stats or changing recency or age.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .peek(key)
            .filter(|entry| entry.is_fresh(self.config.ttl, now))
            .map(|entry| entry.value.clone())
    }

    /// Store a value, evicting the least recently used entry when full.
    pub fn set(&self, key: K, value: V) {
        let entry = Entry {
            value,
            refreshed_at: Instant::now(),
        };
        let mut entries = self.entries.lock();
        // `push` also hands back the old pair when `key` was already present.
        let evicted = entries
            .push(key.clone(), entry)
            .map(|(old_key, _)| old_key)
            .filter(|old_key| *old_key != key);
        self.current_size.store(entries.len(), Ordering::Relaxed);
        drop(entries);

        if let Some(evicted) = evicted {
            log::debug!("Evicted least recently used key: {:?}", evicted);
        }
        log::debug!("Stored in cache with key: {:?}", key);
    }

    /// Whether a fresh entry exists; leaves stats, recency and age untouched.
    pub fn has(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|entry| entry.is_fresh(self.config.ttl, now))
    }

    /// Remove expired entries from cache
    pub fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let stale: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(self.config.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        self.current_size.store(entries.len(), Ordering::Relaxed);
        drop(entries);

        if !stale.is_empty() {
            log::debug!("Purged {} stale cache entries", stale.len());
        }
        stale.len()
    }

    /// Clear all cache entries. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.current_size.store(0, Ordering::Relaxed);
        drop(entries);
        log::info!("Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            current_size: self.current_size.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> TtlLruCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Start the periodic stale-entry sweep.
    ///
    /// The task only holds a weak reference and ends by itself once the cache
    /// is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> BackgroundTask {
        let cache = Arc::downgrade(self);
        BackgroundTask::spawn_periodic("cache-sweep", self.config.sweep_interval, move || {
            match cache.upgrade() {
                Some(cache) => {
                    cache.purge_stale();
                    true
                }
                None => false,
            }
        })
    }
}

/// Thread-safe wrapper for the cache
pub type SharedCache<K, V> = Arc<TtlLruCache<K, V>>;
