use crate::types::{AnalysisResult, SourceUnit};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of analysis results kept
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Hex SHA-256 of `content`
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Identity of an analysis: same path, same bytes, same analyzer settings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: String,
    pub content_hash: String,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(unit: &SourceUnit, fingerprint: impl Into<String>) -> Self {
        Self {
            path: unit.path.clone(),
            content_hash: content_hash(&unit.content),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Opt-in LRU cache of analysis results.
///
/// Callers hold it across review runs; nothing is cached unless a cache is passed to
/// [`crate::analyze_all`].
pub struct AnalysisCache {
    entries: LruCache<CacheKey, Arc<AnalysisResult>>,
    hits: u64,
    misses: u64,
}

impl AnalysisCache {
    /// Create a cache holding at most `capacity` results (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a result, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<AnalysisResult>> {
        match self.entries.get(key) {
            Some(result) => {
                self.hits += 1;
                Some(Arc::clone(result))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, result: Arc<AnalysisResult>) {
        self.entries.put(key, result);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Fraction of lookups answered from the cache
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Drop all entries and reset counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
