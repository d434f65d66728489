/// Descriptor cache for compiled scopes
///
/// Avoids re-lowering and re-emitting a scope whose source has not changed.
///
/// # Architecture
///
/// Cache Key: (entity_label, scope_name)
/// Cache Value: compiled [`ScopeDescriptor`] plus the content hash of the
/// source it was compiled from
///
/// A lookup whose current source hash differs from the stored one drops the
/// entry and reports a miss; the caller recompiles and replaces it. Entries
/// never expire on time. LRU eviction bounds the entry count.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ScopeDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorCacheKey {
    pub entity: String,
    pub scope: String,
}

impl DescriptorCacheKey {
    pub fn new(entity: &str, scope: &str) -> Self {
        DescriptorCacheKey {
            entity: entity.to_string(),
            scope: scope.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    descriptor: ScopeDescriptor,
    /// Logical clock value of the last access (for LRU)
    last_accessed: u64,
    access_count: u64,
}

/// Descriptor cache with content-hash invalidation and LRU eviction
#[derive(Debug)]
pub struct DescriptorCache {
    cache: Arc<Mutex<HashMap<DescriptorCacheKey, CacheEntry>>>,
    enabled: bool,
    max_entries: usize,
    clock: Arc<AtomicU64>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
}

impl DescriptorCache {
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        DescriptorCache {
            cache: Arc::new(Mutex::new(HashMap::new())),
            enabled,
            max_entries: max_entries.max(1),
            clock: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Entries are plain data, so a poisoned lock is still safe to reuse
    fn lock(&self) -> MutexGuard<'_, HashMap<DescriptorCacheKey, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Get a descriptor compiled from a source with hash `source_hash`
    pub fn get(&self, key: &DescriptorCacheKey, source_hash: &str) -> Option<ScopeDescriptor> {
        if !self.enabled {
            return None;
        }

        let now = self.tick();
        let mut cache = self.lock();
        let fresh = cache
            .get(key)
            .map(|entry| entry.descriptor.source_hash == source_hash);
        match fresh {
            Some(true) => {
                let entry = cache.get_mut(key)?;
                entry.last_accessed = now;
                entry.access_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.descriptor.clone())
            }
            Some(false) => {
                log::debug!(
                    "Source of scope `{}.{}` changed, dropping cached descriptor",
                    key.entity,
                    key.scope
                );
                cache.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a descriptor
    ///
    /// May trigger LRU eviction if cache is full
    pub fn insert(&self, key: DescriptorCacheKey, descriptor: ScopeDescriptor) {
        if !self.enabled {
            return;
        }

        let entry = CacheEntry {
            descriptor,
            last_accessed: self.tick(),
            access_count: 0,
        };

        let mut cache = self.lock();
        if !cache.contains_key(&key) && cache.len() >= self.max_entries {
            self.evict_lru(&mut cache);
        }
        cache.insert(key, entry);
    }

    /// Evict least recently used entry
    fn evict_lru(&self, cache: &mut HashMap<DescriptorCacheKey, CacheEntry>) {
        if let Some((key, _)) = cache.iter().min_by_key(|(_, entry)| entry.last_accessed) {
            let key = key.clone();
            cache.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every descriptor of one entity
    pub fn invalidate_entity(&self, entity: &str) {
        self.lock().retain(|key, _| key.entity != entity);
    }

    /// Clear entire cache
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of times a cached descriptor has been served
    pub fn access_count(&self, key: &DescriptorCacheKey) -> Option<u64> {
        self.lock().get(key).map(|e| e.access_count)
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.lock().len(),
            max_entries: self.max_entries,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
