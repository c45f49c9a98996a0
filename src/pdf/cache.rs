//! LRU cache for rendered page surfaces

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::{RasterSurface, scale_key};

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number (1-based)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale_millionths: scale_key(scale),
        }
    }
}

/// LRU cache for rendered surfaces
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<RasterSurface>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached page, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RasterSurface>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a surface into the cache, returning an Arc to it
    pub fn insert(&mut self, key: CacheKey, surface: RasterSurface) -> Arc<RasterSurface> {
        let arc = Arc::new(surface);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageViewport;

    fn surface(page: usize, scale: f32) -> RasterSurface {
        RasterSurface::blank(page, scale, &PageViewport::new(10.0, 10.0))
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new(4);
        let key = CacheKey::new(1, 1.0);
        cache.insert(key.clone(), surface(1, 1.0));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert!(!cache.contains(&CacheKey::new(1, 1.25)));
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = PageCache::new(2);
        for page in 1..=3 {
            cache.insert(CacheKey::new(page, 1.0), surface(page, 1.0));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::new(1, 1.0)));
        assert!(cache.contains(&CacheKey::new(3, 1.0)));
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = PageCache::new(4);
        cache.insert(CacheKey::new(1, 1.0), surface(1, 1.0));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_still_holds_one_page() {
        let mut cache = PageCache::new(0);
        cache.insert(CacheKey::new(1, 1.0), surface(1, 1.0));
        assert_eq!(cache.len(), 1);
    }
}
