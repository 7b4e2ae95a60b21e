//! Page cache keyed by page number.
//!
//! The cache never evicts and is only updated by this process's own writes,
//! so it is correct only while this process is the sole writer of the file.

use crate::page::PageNum;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache lookups
    pub lookups: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of insertions (including overwrites by page writes)
    pub insertions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Reset all statistics to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Unbounded cache of full page images.
///
/// Memory grows with the number of distinct pages touched.
#[derive(Debug, Default)]
pub struct PageCache {
    pages: RwLock<HashMap<PageNum, Bytes>>,
    stats: RwLock<CacheStats>,
}

impl PageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a page image, recording a hit or a miss.
    pub fn get(&self, page_num: PageNum) -> Option<Bytes> {
        let found = self.pages.read().get(&page_num).cloned();

        let mut stats = self.stats.write();
        stats.lookups += 1;
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Insert or replace a page image.
    pub fn insert(&self, page_num: PageNum, data: Bytes) {
        self.pages.write().insert(page_num, data);
        self.stats.write().insertions += 1;
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    /// Reset cache statistics to zero.
    pub fn reset_stats(&self) {
        self.stats.write().reset();
    }

    /// Get the number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
