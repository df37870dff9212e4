//! LRU cache for compiled policy templates
//!
//! Keys include both delimiters, so a policy that changes its delimiters
//! never picks up a matcher compiled for the old ones.

use super::pattern::compile;
use crate::error::PatternError;
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::num::NonZeroUsize;

/// Cache key for a compiled template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey {
    template: String,
    start: char,
    end: char,
}

/// Thread-safe LRU cache of compiled templates
pub struct PatternCache {
    cache: Mutex<LruCache<PatternKey, Regex, ahash::RandomState>>,
}

impl PatternCache {
    /// Create a cache holding up to `capacity` compiled templates
    ///
    /// Returns `None` for a zero capacity.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(PatternCache {
            cache: Mutex::new(LruCache::with_hasher(capacity, ahash::RandomState::new())),
        })
    }

    /// Get a compiled template, compiling and inserting it on a miss
    ///
    /// Compile failures are not cached.
    pub fn get_or_compile(
        &self,
        template: &str,
        start: char,
        end: char,
    ) -> Result<Regex, PatternError> {
        let key = PatternKey {
            template: template.to_string(),
            start,
            end,
        };

        if let Some(regex) = self.cache.lock().get(&key) {
            return Ok(regex.clone());
        }

        // Compile outside the lock; a concurrent miss just compiles twice
        let regex = compile(template, start, end)?;
        self.cache.lock().put(key, regex.clone());
        Ok(regex)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Get cache statistics
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
